//! EcoSentinel CLI - spectral compliance auditing

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ecosentinel_analysis::classify::ClassifyParams;
use ecosentinel_analysis::indices::{ndvi, ndwi};
use ecosentinel_analysis::pipeline::{run_audit, run_audit_tiled};
use ecosentinel_analysis::summary::{ComplianceParams, ComplianceSummary};
use ecosentinel_core::io::{read_geotiff, write_geotiff};
use ecosentinel_core::{Raster, Scene};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ecosentinel")]
#[command(author, version, about = "EUDR compliance auditing for multispectral imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// NDVI: Normalized Difference Vegetation Index
    Ndvi {
        /// NIR band file (Sentinel-2 B08)
        #[arg(long)]
        nir: PathBuf,
        /// Red band file (Sentinel-2 B04)
        #[arg(long)]
        red: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// NDWI: Normalized Difference Water Index (McFeeters)
    Ndwi {
        /// Green band file (Sentinel-2 B03)
        #[arg(long)]
        green: PathBuf,
        /// NIR band file (Sentinel-2 B08)
        #[arg(long)]
        nir: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Classify a four-band scene and produce the compliance verdict
    Audit {
        /// Blue band file (Sentinel-2 B02)
        #[arg(long)]
        blue: PathBuf,
        /// Green band file (Sentinel-2 B03)
        #[arg(long)]
        green: PathBuf,
        /// Red band file (Sentinel-2 B04)
        #[arg(long)]
        red: PathBuf,
        /// NIR band file (Sentinel-2 B08)
        #[arg(long)]
        nir: PathBuf,
        /// Output file for the classification grid
        #[arg(long)]
        classification: Option<PathBuf>,
        /// Output file for the summary JSON
        #[arg(long)]
        stats: Option<PathBuf>,
        /// NDWI above this is water
        #[arg(long, default_value = "0.0")]
        water_threshold: f64,
        /// Lower NDVI bound of the risk band
        #[arg(long, default_value = "0.25")]
        risk_low: f64,
        /// Upper NDVI bound of the risk band
        #[arg(long, default_value = "0.45")]
        risk_high: f64,
        /// Stressed percent of valid pixels above which the verdict is
        /// Critical Risk
        #[arg(long, default_value = "40.0")]
        stress_cutoff: f64,
        /// Process in tiles of this size instead of the whole grid
        /// (summary only, no classification output)
        #[arg(long)]
        tile_size: Option<usize>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_band(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn load_scene(blue: &PathBuf, green: &PathBuf, red: &PathBuf, nir: &PathBuf) -> Result<Scene> {
    let pb = spinner("Loading bands...");
    let scene = Scene::from_geotiffs(blue, green, red, nir)
        .context("Failed to assemble scene from band files")?;
    pb.finish_and_clear();
    let (rows, cols) = scene.shape();
    info!("Scene: {} x {} ({} pixels per band)", cols, rows, scene.len());
    Ok(scene)
}

fn write_result<T: ecosentinel_core::RasterElement>(
    raster: &Raster<T>,
    path: &PathBuf,
) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path)
        .with_context(|| format!("Failed to write output {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn write_stats(summary: &ComplianceSummary, path: &PathBuf) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write stats {}", path.display()))?;
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_summary(summary: &ComplianceSummary) {
    println!("Verdict: {}", summary.verdict);
    println!("  Stressed: {:.2}% of valid pixels (cutoff {:.1}%)",
        summary.stressed_pct, summary.stress_cutoff_pct);
    println!("  Healthy vegetation: {:.2}%", summary.healthy_pct);
    println!("  Water: {:.2}%", summary.water_pct);
    println!("  Bare/other: {:.2}%", summary.bare_pct);
    println!("  Vegetation cover: {:.2}%", summary.vegetation_cover_pct);
    println!(
        "  Valid pixels: {} / {}",
        summary.counts.valid(),
        summary.counts.total()
    );
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_band(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            let (cx, cy) = raster.transform().pixel_to_geo(cols / 2, rows / 2);
            println!("Center: ({:.6}, {:.6})", cx, cy);
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {:?}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── NDVI ─────────────────────────────────────────────────────
        Commands::Ndvi { nir, red, output } => {
            let nir_band = read_band(&nir)?;
            let red_band = read_band(&red)?;
            let start = Instant::now();
            let result = ndvi(&nir_band, &red_band).context("Failed to calculate NDVI")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("NDVI", &output, elapsed);
        }

        // ── NDWI ─────────────────────────────────────────────────────
        Commands::Ndwi { green, nir, output } => {
            let green_band = read_band(&green)?;
            let nir_band = read_band(&nir)?;
            let start = Instant::now();
            let result = ndwi(&green_band, &nir_band).context("Failed to calculate NDWI")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("NDWI", &output, elapsed);
        }

        // ── Audit ────────────────────────────────────────────────────
        Commands::Audit {
            blue,
            green,
            red,
            nir,
            classification,
            stats,
            water_threshold,
            risk_low,
            risk_high,
            stress_cutoff,
            tile_size,
        } => {
            let classify_params = ClassifyParams {
                water_threshold,
                risk_low,
                risk_high,
            };
            let compliance_params = ComplianceParams {
                stress_cutoff_pct: stress_cutoff,
            };

            let scene = load_scene(&blue, &green, &red, &nir)?;
            let start = Instant::now();

            let summary = match tile_size {
                Some(size) => {
                    info!("Tiled audit, tile size {}", size);
                    if classification.is_some() {
                        anyhow::bail!(
                            "--classification is not available with --tile-size; \
                             the tiled path does not materialize the grid"
                        );
                    }
                    run_audit_tiled(&scene, classify_params, compliance_params, size)
                        .context("Audit failed")?
                }
                None => {
                    let result = run_audit(&scene, classify_params, compliance_params)
                        .context("Audit failed")?;
                    if let Some(path) = &classification {
                        write_result(&result.classification, path)?;
                        done("Classification", path, start.elapsed());
                    }
                    result.summary
                }
            };

            info!("Audit completed in {:.2?}", start.elapsed());

            if let Some(path) = &stats {
                write_stats(&summary, path)?;
                println!("Summary saved to: {}", path.display());
            }

            print_summary(&summary);
        }
    }

    Ok(())
}

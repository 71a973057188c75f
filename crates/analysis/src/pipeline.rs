//! End-to-end audit pipeline
//!
//! Wires the stages together: scene bands -> index grids -> per-pixel
//! classification -> compliance summary.

use crate::classify::{classify, ClassifyParams};
use crate::indices::{ndvi, ndwi};
use crate::summary::{count_classes, summarize, ComplianceParams, ComplianceSummary};
use crate::tiled::audit_tiles;
use ecosentinel_core::raster::Raster;
use ecosentinel_core::{Result, Scene};

/// Classification grid plus the aggregate verdict for one scene.
#[derive(Debug, Clone)]
pub struct AuditResult {
    /// Per-pixel class codes, georeferenced like the input bands
    pub classification: Raster<u8>,
    pub summary: ComplianceSummary,
}

/// Run the full audit over a scene, materializing the classification
/// grid.
pub fn run_audit(
    scene: &Scene,
    classify_params: ClassifyParams,
    compliance_params: ComplianceParams,
) -> Result<AuditResult> {
    let vegetation = ndvi(scene.nir(), scene.red())?;
    let water = ndwi(scene.green(), scene.nir())?;

    let classification = classify(&vegetation, &water, classify_params)?;
    let summary = summarize(count_classes(&classification), compliance_params)?;

    Ok(AuditResult {
        classification,
        summary,
    })
}

/// Run the audit tile by tile, producing only the summary.
///
/// For scenes too large to hold index and classification grids in
/// memory alongside the bands.
pub fn run_audit_tiled(
    scene: &Scene,
    classify_params: ClassifyParams,
    compliance_params: ComplianceParams,
    tile_size: usize,
) -> Result<ComplianceSummary> {
    let counts = audit_tiles(scene, classify_params, tile_size)?;
    summarize(counts, compliance_params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PixelClass;
    use crate::summary::Verdict;
    use ecosentinel_core::{GeoTransform, Raster};

    fn band(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_audit_classifies_and_summarizes() {
        // 2x2: healthy, stressed, water, bare
        let blue = band(vec![0.05; 4], 2, 2);
        let green = band(vec![0.08, 0.10, 0.30, 0.20], 2, 2);
        let red = band(vec![0.05, 0.20, 0.15, 0.25], 2, 2);
        let nir = band(vec![0.45, 0.38, 0.05, 0.28], 2, 2);

        let scene = Scene::new(blue, green, red, nir).unwrap();
        let result = run_audit(&scene, ClassifyParams::default(), ComplianceParams::default())
            .unwrap();

        assert_eq!(
            result.classification.get(0, 0).unwrap(),
            PixelClass::Healthy.code()
        );
        assert_eq!(
            result.classification.get(0, 1).unwrap(),
            PixelClass::Stressed.code()
        );
        assert_eq!(
            result.classification.get(1, 0).unwrap(),
            PixelClass::Water.code()
        );
        assert_eq!(
            result.classification.get(1, 1).unwrap(),
            PixelClass::Bare.code()
        );

        assert_eq!(result.summary.counts.stressed, 1);
        assert!((result.summary.stressed_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_classification_keeps_georeferencing() {
        let gt = GeoTransform::new(500000.0, 4400000.0, 10.0, -10.0);
        let mk = |v: f64| {
            let mut r = Raster::filled(3, 3, v);
            r.set_transform(gt);
            r
        };

        let scene = Scene::new(mk(0.05), mk(0.08), mk(0.05), mk(0.45)).unwrap();
        let result = run_audit(&scene, ClassifyParams::default(), ComplianceParams::default())
            .unwrap();

        assert!(result.classification.transform().is_aligned_with(&gt));
    }

    #[test]
    fn test_tiled_summary_matches_whole_grid() {
        let n = 12 * 12;
        let green: Vec<f64> = (0..n).map(|i| 0.05 + (i % 7) as f64 * 0.04).collect();
        let red: Vec<f64> = (0..n).map(|i| 0.05 + (i % 5) as f64 * 0.05).collect();
        let nir: Vec<f64> = (0..n).map(|i| 0.10 + (i % 11) as f64 * 0.04).collect();

        let scene = Scene::new(
            band(vec![0.05; n], 12, 12),
            band(green, 12, 12),
            band(red, 12, 12),
            band(nir, 12, 12),
        )
        .unwrap();

        let whole = run_audit(&scene, ClassifyParams::default(), ComplianceParams::default())
            .unwrap()
            .summary;
        let tiled = run_audit_tiled(
            &scene,
            ClassifyParams::default(),
            ComplianceParams::default(),
            5,
        )
        .unwrap();

        assert_eq!(whole.counts, tiled.counts);
        assert_eq!(whole.verdict, tiled.verdict);
    }

    #[test]
    fn test_cloud_obscured_scene_is_indeterminate() {
        let nan = band(vec![f64::NAN; 9], 3, 3);
        let scene = Scene::new(nan.clone(), nan.clone(), nan.clone(), nan).unwrap();

        let result = run_audit(&scene, ClassifyParams::default(), ComplianceParams::default())
            .unwrap();

        assert_eq!(result.summary.verdict, Verdict::Indeterminate);
        assert_eq!(result.summary.counts.nodata, 9);
    }
}

//! Spectral index grids
//!
//! Normalized difference indices computed from pairs of aligned
//! reflectance bands. All kernels are pointwise, parallel over rows,
//! and recover locally from division by zero with a NaN sentinel
//! instead of failing.

use crate::maybe_rayon::*;
use ecosentinel_core::raster::Raster;
use ecosentinel_core::{Error, Result};
use ndarray::Array2;

/// Denominators with magnitude below this are treated as zero.
const ZERO_SUM_EPS: f64 = 1e-10;

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Finite results are bounded in [-1, 1]. Pixels where the band sum is
/// zero, or where either band is nodata, are set to the NaN sentinel.
/// A dimension mismatch between the bands is a fatal error.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };
                row_data[col] = nd_pixel(a, b, nodata_a, nodata_b);
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalized difference for a single pixel pair, NaN sentinel on
/// nodata inputs or a zero band sum. Shared with the tiled path so both
/// agree pixel for pixel.
pub(crate) fn nd_pixel(a: f64, b: f64, nodata_a: Option<f64>, nodata_b: Option<f64>) -> f64 {
    if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
        return f64::NAN;
    }

    let sum = a + b;
    if sum.abs() < ZERO_SUM_EPS {
        return f64::NAN; // Avoid division by zero
    }

    (a - b) / sum
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

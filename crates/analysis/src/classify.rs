//! Threshold classification of index grids
//!
//! Applies ordered rules to the NDVI and NDWI grids to label each pixel.
//! Water is evaluated before the vegetation rules so that water bodies
//! never register as stressed vegetation.

use crate::maybe_rayon::*;
use ecosentinel_core::raster::Raster;
use ecosentinel_core::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-pixel classification label with a stable raster code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelClass {
    /// Dense, healthy vegetation (NDVI at or above the risk band)
    Healthy,
    /// Sparse or stressed vegetation (NDVI within the risk band)
    Stressed,
    /// Open water, masked out before vegetation rules
    Water,
    /// Bare soil, urban or otherwise non-vegetated surface
    Bare,
    /// No usable observation (cloud, missing band value)
    NoData,
}

impl PixelClass {
    /// Raster code for this class
    pub fn code(self) -> u8 {
        match self {
            PixelClass::NoData => 0,
            PixelClass::Healthy => 1,
            PixelClass::Stressed => 2,
            PixelClass::Water => 3,
            PixelClass::Bare => 4,
        }
    }

    /// Class for a raster code, if valid
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PixelClass::NoData),
            1 => Some(PixelClass::Healthy),
            2 => Some(PixelClass::Stressed),
            3 => Some(PixelClass::Water),
            4 => Some(PixelClass::Bare),
            _ => None,
        }
    }
}

/// Thresholds for the classification rules.
///
/// Adjustable per call; defaults follow the Sentinel-2 water-stress
/// configuration (water at NDWI 0, risk band NDVI [0.25, 0.45)).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifyParams {
    /// NDWI above this is water
    pub water_threshold: f64,
    /// NDVI below this is non-vegetated
    pub risk_low: f64,
    /// NDVI at or above this is healthy vegetation
    pub risk_high: f64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            water_threshold: 0.0,
            risk_low: 0.25,
            risk_high: 0.45,
        }
    }
}

impl ClassifyParams {
    /// Check that the thresholds describe a usable rule set
    pub fn validate(&self) -> Result<()> {
        if !self.water_threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "water_threshold",
                value: self.water_threshold.to_string(),
                reason: "must be finite".to_string(),
            });
        }
        if !self.risk_low.is_finite() || !self.risk_high.is_finite() {
            return Err(Error::InvalidParameter {
                name: "risk_low/risk_high",
                value: format!("{}/{}", self.risk_low, self.risk_high),
                reason: "must be finite".to_string(),
            });
        }
        if self.risk_low >= self.risk_high {
            return Err(Error::InvalidParameter {
                name: "risk_low",
                value: self.risk_low.to_string(),
                reason: format!("must be below risk_high ({})", self.risk_high),
            });
        }
        Ok(())
    }

    /// Classify a single pixel from its index values.
    ///
    /// Rule order matters: water exclusion runs first so flooded or
    /// open-water pixels are never counted as vegetation stress.
    pub fn classify_pixel(&self, ndvi: f64, ndwi: f64) -> PixelClass {
        if ndvi.is_nan() || ndwi.is_nan() {
            PixelClass::NoData
        } else if ndwi > self.water_threshold {
            PixelClass::Water
        } else if ndvi >= self.risk_high {
            PixelClass::Healthy
        } else if ndvi >= self.risk_low {
            PixelClass::Stressed
        } else {
            PixelClass::Bare
        }
    }
}

/// Classify every pixel of the NDVI/NDWI grids.
///
/// Output is a `u8` raster of [`PixelClass`] codes sharing the input
/// georeferencing. The two grids must have identical dimensions.
pub fn classify(
    ndvi: &Raster<f64>,
    ndwi: &Raster<f64>,
    params: ClassifyParams,
) -> Result<Raster<u8>> {
    params.validate()?;

    if ndvi.shape() != ndwi.shape() {
        return Err(Error::SizeMismatch {
            er: ndvi.rows(),
            ec: ndvi.cols(),
            ar: ndwi.rows(),
            ac: ndwi.cols(),
        });
    }

    let (rows, cols) = ndvi.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![PixelClass::NoData.code(); cols];
            for col in 0..cols {
                let v = unsafe { ndvi.get_unchecked(row, col) };
                let w = unsafe { ndwi.get_unchecked(row, col) };
                row_data[col] = params.classify_pixel(v, w).code();
            }
            row_data
        })
        .collect();

    let mut output = ndvi.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(PixelClass::NoData.code()));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosentinel_core::GeoTransform;

    fn make_grid(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_rule_order_water_first() {
        let params = ClassifyParams::default();

        // NDVI inside the risk band, but the pixel is water: the water
        // rule must win.
        assert_eq!(params.classify_pixel(0.30, 0.2), PixelClass::Water);
        assert_eq!(params.classify_pixel(0.30, -0.2), PixelClass::Stressed);
    }

    #[test]
    fn test_class_boundaries() {
        let params = ClassifyParams::default();

        assert_eq!(params.classify_pixel(0.45, -0.5), PixelClass::Healthy);
        assert_eq!(params.classify_pixel(0.449, -0.5), PixelClass::Stressed);
        assert_eq!(params.classify_pixel(0.25, -0.5), PixelClass::Stressed);
        assert_eq!(params.classify_pixel(0.249, -0.5), PixelClass::Bare);
        assert_eq!(params.classify_pixel(f64::NAN, -0.5), PixelClass::NoData);
        assert_eq!(params.classify_pixel(0.5, f64::NAN), PixelClass::NoData);
    }

    #[test]
    fn test_custom_thresholds() {
        let params = ClassifyParams {
            water_threshold: 0.1,
            risk_low: 0.3,
            risk_high: 0.6,
        };

        assert_eq!(params.classify_pixel(0.5, 0.05), PixelClass::Stressed);
        assert_eq!(params.classify_pixel(0.5, 0.15), PixelClass::Water);
        assert_eq!(params.classify_pixel(0.65, 0.0), PixelClass::Healthy);
    }

    #[test]
    fn test_classify_grid() {
        let ndvi = make_grid(vec![0.6, 0.3, 0.1, f64::NAN], 2, 2);
        let ndwi = make_grid(vec![-0.4, -0.4, 0.3, -0.4], 2, 2);

        let result = classify(&ndvi, &ndwi, ClassifyParams::default()).unwrap();

        assert_eq!(result.get(0, 0).unwrap(), PixelClass::Healthy.code());
        assert_eq!(result.get(0, 1).unwrap(), PixelClass::Stressed.code());
        assert_eq!(result.get(1, 0).unwrap(), PixelClass::Water.code());
        assert_eq!(result.get(1, 1).unwrap(), PixelClass::NoData.code());
    }

    #[test]
    fn test_classify_is_deterministic() {
        let ndvi = make_grid(vec![0.6, 0.3, 0.1, 0.5, -0.2, 0.44], 2, 3);
        let ndwi = make_grid(vec![-0.4, -0.4, 0.3, -0.1, 0.5, -0.3], 2, 3);

        let a = classify(&ndvi, &ndwi, ClassifyParams::default()).unwrap();
        let b = classify(&ndvi, &ndwi, ClassifyParams::default()).unwrap();

        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_invalid_risk_band_rejected() {
        let ndvi = make_grid(vec![0.5; 4], 2, 2);
        let ndwi = make_grid(vec![-0.5; 4], 2, 2);

        let params = ClassifyParams {
            water_threshold: 0.0,
            risk_low: 0.5,
            risk_high: 0.25,
        };

        assert!(classify(&ndvi, &ndwi, params).is_err());
    }

    #[test]
    fn test_grid_size_mismatch_rejected() {
        let ndvi = make_grid(vec![0.5; 4], 2, 2);
        let ndwi = make_grid(vec![-0.5; 6], 2, 3);

        assert!(classify(&ndvi, &ndwi, ClassifyParams::default()).is_err());
    }

    #[test]
    fn test_code_roundtrip() {
        for class in [
            PixelClass::NoData,
            PixelClass::Healthy,
            PixelClass::Stressed,
            PixelClass::Water,
            PixelClass::Bare,
        ] {
            assert_eq!(PixelClass::from_code(class.code()), Some(class));
        }
        assert_eq!(PixelClass::from_code(99), None);
    }
}

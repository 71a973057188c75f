//! Multispectral scene loading
//!
//! A `Scene` bundles the four co-registered reflectance bands the audit
//! pipeline consumes (Blue, Green, Red, Near-Infrared; Sentinel-2 B02,
//! B03, B04, B08). Construction validates that every band shares the
//! same dimensions, georeferencing and CRS; any mismatch is fatal and
//! no partial scene is returned.

use crate::error::{Error, Result};
use crate::io::read_geotiff;
use crate::raster::Raster;
use std::path::Path;

/// Four aligned reflectance bands for one analysis area.
#[derive(Debug, Clone)]
pub struct Scene {
    blue: Raster<f64>,
    green: Raster<f64>,
    red: Raster<f64>,
    nir: Raster<f64>,
}

impl Scene {
    /// Assemble a scene from already-loaded bands, validating alignment.
    pub fn new(
        blue: Raster<f64>,
        green: Raster<f64>,
        red: Raster<f64>,
        nir: Raster<f64>,
    ) -> Result<Self> {
        check_band(&blue, &green, "green")?;
        check_band(&blue, &red, "red")?;
        check_band(&blue, &nir, "nir")?;

        Ok(Self {
            blue,
            green,
            red,
            nir,
        })
    }

    /// Load a scene from four single-band GeoTIFF files.
    pub fn from_geotiffs<P: AsRef<Path>>(blue: P, green: P, red: P, nir: P) -> Result<Self> {
        Self::new(
            read_geotiff(blue)?,
            read_geotiff(green)?,
            read_geotiff(red)?,
            read_geotiff(nir)?,
        )
    }

    /// Blue band (B02). Not used by the index kernels, but validated for
    /// alignment so true-color rendering by external tools stays
    /// registered with the classification.
    pub fn blue(&self) -> &Raster<f64> {
        &self.blue
    }

    /// Green band (B03)
    pub fn green(&self) -> &Raster<f64> {
        &self.green
    }

    /// Red band (B04)
    pub fn red(&self) -> &Raster<f64> {
        &self.red
    }

    /// Near-infrared band (B08)
    pub fn nir(&self) -> &Raster<f64> {
        &self.nir
    }

    /// Dimensions as (rows, cols), shared by all bands
    pub fn shape(&self) -> (usize, usize) {
        self.blue.shape()
    }

    /// Total number of pixels per band
    pub fn len(&self) -> usize {
        self.blue.len()
    }

    /// Whether the scene has no pixels
    pub fn is_empty(&self) -> bool {
        self.blue.is_empty()
    }
}

fn check_band(
    reference: &Raster<f64>,
    band: &Raster<f64>,
    name: &'static str,
) -> Result<()> {
    if reference.shape() != band.shape() {
        let (er, ec) = reference.shape();
        let (ar, ac) = band.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    if !reference.transform().is_aligned_with(band.transform()) {
        return Err(Error::TransformMismatch { band: name });
    }

    if let (Some(a), Some(b)) = (reference.crs(), band.crs()) {
        if !a.is_equivalent(b) {
            return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
        }
    }

    Ok(())
}

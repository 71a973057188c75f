//! # EcoSentinel Core
//!
//! Core types and I/O for the EcoSentinel compliance-auditing pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced raster grid
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Crs`: coordinate reference system handling
//! - `Scene`: a set of co-registered multispectral reflectance bands
//! - Native GeoTIFF reading/writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod scene;

pub use crs::Crs;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use scene::Scene;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::scene::Scene;
}

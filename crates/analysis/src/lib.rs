//! # EcoSentinel Analysis
//!
//! Spectral classification for compliance auditing. Turns a
//! four-band reflectance [`Scene`](ecosentinel_core::Scene) into a
//! per-pixel risk classification and an aggregate compliance verdict:
//!
//! 1. **indices** — NDVI / NDWI normalized difference grids
//! 2. **classify** — ordered threshold rules (water masked first)
//! 3. **summary** — per-class percentages and the verdict
//! 4. **tiled** — chunked execution for rasters that do not fit memory

pub mod classify;
pub mod indices;
pub(crate) mod maybe_rayon;
pub mod pipeline;
pub mod summary;
pub mod tiled;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classify::{classify, ClassifyParams, PixelClass};
    pub use crate::indices::{ndvi, ndwi, normalized_difference};
    pub use crate::pipeline::{run_audit, AuditResult};
    pub use crate::summary::{
        count_classes, summarize, ClassCounts, ComplianceParams, ComplianceSummary, Verdict,
    };
    pub use crate::tiled::{audit_tiles, Tile, TileIterator};
    pub use ecosentinel_core::prelude::*;
}

//! # fieldcheck algorithms
//!
//! Local implementations of the raster and vector operations fieldcheck
//! relies on:
//!
//! - **imagery**: normalized difference / NDVI, quality-band masking,
//!   temporal change detection
//! - **statistics**: region mean sampled at a fixed scale
//! - **vector**: planar and geodesic polygon area

pub mod imagery;
pub mod statistics;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        bits_clear, detect_changes, normalized_difference, update_mask, ChangeEvent,
        ChangeParams, SceneSummary,
    };
    pub use crate::statistics::{region_mean, region_statistics, RegionStatistics};
    pub use crate::vector::{geodesic_area, planar_area, to_hectares};
    pub use fieldcheck_core::prelude::*;
}

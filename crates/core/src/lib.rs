//! # fieldcheck core
//!
//! Core types shared by the fieldcheck crates:
//! - [`Geometry`]: validated polygon parsed from client input
//! - [`Raster`]: georeferenced `f64` grid, masked cells are NaN
//! - [`GeoTransform`]: affine transformation for georeferencing

pub mod error;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster};
pub use vector::{Geometry, Vertex};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster};
    pub use crate::vector::{parse_geometry, Geometry, Vertex};
}

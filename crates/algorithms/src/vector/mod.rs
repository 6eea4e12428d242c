//! Vector measurements

mod measurements;

pub use measurements::{geodesic_area, planar_area, to_hectares, SQUARE_METERS_PER_HECTARE};

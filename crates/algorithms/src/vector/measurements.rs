//! Polygon area measurements

use fieldcheck_core::Geometry;
use geo::{Area, GeodesicArea};

/// Square map units in one hectare when map units are meters.
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Planar area of a polygon, holes subtracted.
///
/// Returns unsigned area in squared coordinate units; use projected
/// coordinates in meters to get square meters.
pub fn planar_area(geom: &Geometry) -> f64 {
    geom.to_polygon().unsigned_area()
}

/// Geodesic area on the WGS84 ellipsoid for `(longitude, latitude)` polygons.
///
/// Returns square meters.
pub fn geodesic_area(geom: &Geometry) -> f64 {
    geom.to_polygon().geodesic_area_unsigned()
}

/// Convert square meters to hectares.
pub fn to_hectares(square_meters: f64) -> f64 {
    square_meters / SQUARE_METERS_PER_HECTARE
}

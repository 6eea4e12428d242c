//! Region statistics
//!
//! Reduces a raster over a polygon by sampling it on a regular grid with a
//! fixed spacing (the reduction "scale"), independent of the raster's own
//! resolution. A sample contributes when its center lies inside the polygon
//! and the raster cell under it is not masked.

use fieldcheck_core::raster::Raster;
use fieldcheck_core::{Error, Result};
use geo::{BoundingRect, Contains, Point, Polygon};

/// Statistics of the valid samples inside a region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStatistics {
    /// Number of valid samples
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl RegionStatistics {
    /// Mean of the valid samples; `None` when no sample was valid
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Sample `raster` inside `region` every `scale` map units.
///
/// The sampling grid is anchored at the map origin: sample centers sit at
/// `((i + 0.5) * scale, (j + 0.5) * scale)`. Returns statistics with
/// `count == 0` when the region has no valid samples.
pub fn region_statistics(
    raster: &Raster,
    region: &Polygon<f64>,
    scale: f64,
) -> Result<RegionStatistics> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "must be a positive number of map units".into(),
        });
    }

    let mut stats = RegionStatistics {
        count: 0,
        sum: 0.0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    let Some(rect) = region.bounding_rect() else {
        return Ok(stats);
    };

    // Only samples over both the region and the raster can count
    let (rx0, ry0, rx1, ry1) = raster.bounds();
    let (x0, x1) = (rect.min().x.max(rx0), rect.max().x.min(rx1));
    let (y0, y1) = (rect.min().y.max(ry0), rect.max().y.min(ry1));
    if x0 > x1 || y0 > y1 {
        return Ok(stats);
    }

    let (i0, i1) = grid_span(x0, x1, scale);
    let (j0, j1) = grid_span(y0, y1, scale);

    for j in j0..i64::max(j0, j1) {
        let y = (j as f64 + 0.5) * scale;
        for i in i0..i64::max(i0, i1) {
            let x = (i as f64 + 0.5) * scale;
            if !region.contains(&Point::new(x, y)) {
                continue;
            }
            if let Some(v) = raster.sample(x, y) {
                stats.count += 1;
                stats.sum += v;
                stats.min = stats.min.min(v);
                stats.max = stats.max.max(v);
            }
        }
    }

    Ok(stats)
}

/// Spatial mean of `raster` over `region` sampled every `scale` units.
///
/// `Ok(None)` means the aggregate is undefined: no valid sample fell inside
/// the region (fully masked, or region smaller than one sample spacing).
pub fn region_mean(raster: &Raster, region: &Polygon<f64>, scale: f64) -> Result<Option<f64>> {
    Ok(region_statistics(raster, region, scale)?.mean())
}

/// Half-open range of grid indices whose sample centers may fall in `[min, max]`.
fn grid_span(min: f64, max: f64, scale: f64) -> (i64, i64) {
    ((min / scale).floor() as i64, (max / scale).ceil() as i64)
}

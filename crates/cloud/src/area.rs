//! Area calculator.

use std::fmt;

use fieldcheck_algorithms::vector::to_hectares;
use fieldcheck_core::Geometry;
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::query::{Query, QueryOutput};
use crate::reos::Reos;

/// Polygon area in hectares.
///
/// Holds the unrounded value; rounding to two decimals happens only when the
/// area is presented (see the `Display` impl).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaResult {
    hectares: f64,
}

impl AreaResult {
    pub fn from_square_meters(square_meters: f64) -> Self {
        Self {
            hectares: to_hectares(square_meters),
        }
    }

    /// Unrounded hectares
    pub fn hectares(&self) -> f64 {
        self.hectares
    }

    /// Hectares rounded to two decimals, halves away from zero
    pub fn rounded(&self) -> f64 {
        (self.hectares * 100.0).round() / 100.0
    }
}

impl fmt::Display for AreaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

/// Ask the service for the area of `geom` and convert it to hectares.
///
/// One evaluation round trip, no retry.
pub async fn compute_area_hectares(reos: &dyn Reos, geom: &Geometry) -> Result<AreaResult> {
    let query = Query::Area {
        region: geom.clone(),
    };

    let square_meters = match reos.evaluate(&query).await? {
        QueryOutput::Area(value) => value,
        other => {
            return Err(CloudError::InvalidResponse(format!(
                "expected an area, got {other:?}"
            )))
        }
    };

    if !square_meters.is_finite() || square_meters < 0.0 {
        return Err(CloudError::InvalidResponse(format!(
            "area must be a non-negative number, got {square_meters}"
        )));
    }

    let area = AreaResult::from_square_meters(square_meters);
    debug!("area: {} m² = {} ha", square_meters, area.hectares());
    Ok(area)
}

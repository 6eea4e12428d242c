//! Request boundary for the two pipelines.
//!
//! Takes raw polygon text, runs a pipeline and translates every failure into
//! a `{"error": ...}` body. Client errors carry the parse reason; server
//! errors carry a fixed message and the details go to the log.

use fieldcheck_algorithms::imagery::{ChangeEvent, ChangeParams};
use fieldcheck_core::vector::parse_geometry;
use fieldcheck_core::Geometry;
use serde::Serialize;
use tracing::{debug, error};

use crate::area::compute_area_hectares;
use crate::changes::detect_vegetation_changes;
use crate::error::CloudError;
use crate::reos::Reos;
use crate::summarizer::SummaryParams;

/// Body of a successful area request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaResponse {
    /// Hectares with exactly two decimals
    pub area: String,
}

/// Body of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Outcome of a request at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    ClientError(ErrorResponse),
    ServerError(ErrorResponse),
}

impl<T: Serialize> Reply<T> {
    /// HTTP-style status code for the outcome.
    pub fn status(&self) -> u16 {
        match self {
            Reply::Ok(_) => 200,
            Reply::ClientError(_) => 400,
            Reply::ServerError(_) => 500,
        }
    }

    /// JSON body of the reply.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Reply::Ok(body) => serde_json::to_value(body),
            Reply::ClientError(body) | Reply::ServerError(body) => serde_json::to_value(body),
        }
    }
}

fn parse(route: &str, raw: &str) -> Result<Geometry, ErrorResponse> {
    debug!("[{route}] raw coordinates: {raw}");
    parse_geometry(raw).map_err(|e| {
        debug!("[{route}] rejected input: {e}");
        ErrorResponse {
            error: format!("Invalid coordinates: {e}"),
        }
    })
}

fn failure<T>(route: &str, err: CloudError, message: &str) -> Reply<T> {
    if err.is_client_error() {
        return Reply::ClientError(ErrorResponse {
            error: format!("Invalid coordinates: {err}"),
        });
    }
    error!("[{route}] {err}");
    Reply::ServerError(ErrorResponse {
        error: message.to_string(),
    })
}

/// Area of the polygon encoded in `raw`, as `{"area": "<hectares>"}`.
pub async fn area(reos: &dyn Reos, raw: &str) -> Reply<AreaResponse> {
    let geom = match parse("area", raw) {
        Ok(geom) => geom,
        Err(body) => return Reply::ClientError(body),
    };

    match compute_area_hectares(reos, &geom).await {
        Ok(area) => {
            debug!("[area] {} ha", area.hectares());
            Reply::Ok(AreaResponse {
                area: area.to_string(),
            })
        }
        Err(e) => failure("area", e, "Failed to calculate area"),
    }
}

/// Vegetation change events over the polygon encoded in `raw`.
pub async fn changes(
    reos: &dyn Reos,
    raw: &str,
    summary_params: &SummaryParams,
    change_params: &ChangeParams,
) -> Reply<Vec<ChangeEvent>> {
    let geom = match parse("changes", raw) {
        Ok(geom) => geom,
        Err(body) => return Reply::ClientError(body),
    };

    match detect_vegetation_changes(reos, &geom, summary_params, change_params).await {
        Ok(events) => {
            debug!("[changes] returning {} events", events.len());
            Reply::Ok(events)
        }
        Err(e) => failure("changes", e, "Remote evaluation failed"),
    }
}

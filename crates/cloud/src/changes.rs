//! Vegetation change pipeline: scene summaries followed by change detection.

use fieldcheck_algorithms::imagery::{detect_changes, ChangeEvent, ChangeParams};
use fieldcheck_core::Geometry;
use tracing::debug;

use crate::error::Result;
use crate::reos::Reos;
use crate::summarizer::{fetch_summaries, SummaryParams};

/// Significant vegetation index rises over `geom`, most recent first.
pub async fn detect_vegetation_changes(
    reos: &dyn Reos,
    geom: &Geometry,
    summary_params: &SummaryParams,
    change_params: &ChangeParams,
) -> Result<Vec<ChangeEvent>> {
    let summaries = fetch_summaries(reos, geom, summary_params).await?;
    let events = detect_changes(&summaries, change_params);
    debug!(
        "{} change events from {} summaries (threshold {})",
        events.len(),
        summaries.len(),
        change_params.threshold
    );
    Ok(events)
}

//! Temporal vegetation change detection
//!
//! Turns a time series of per-scene index means into a list of significant
//! increases between consecutive observations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default minimum rise of the mean index between consecutive scenes.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.2;

/// Mean vegetation index of one scene over the region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    /// Catalog identifier of the scene
    pub scene_id: String,
    /// Capture instant
    pub timestamp: DateTime<Utc>,
    /// Spatial mean of the index, computed after optional masking
    pub mean_index: f64,
    /// Whether a cloud-mask-capable band was used for this scene
    pub has_quality_band: bool,
}

/// A significant rise of the mean index between two consecutive scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Capture date of the earlier scene
    pub date_from: NaiveDate,
    /// Capture date of the later scene
    pub date_to: NaiveDate,
    /// `mean(later) - mean(earlier)`, always above the threshold
    pub difference: f64,
}

/// Parameters for [`detect_changes`]
#[derive(Debug, Clone)]
pub struct ChangeParams {
    /// Strict lower bound on the difference (default 0.2)
    pub threshold: f64,
}

impl Default for ChangeParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CHANGE_THRESHOLD,
        }
    }
}

/// Detect significant increases between chronologically adjacent scenes.
///
/// Summaries are sorted by timestamp (stable, so equal timestamps keep their
/// input order), each adjacent pair is differenced as `later - earlier`, and
/// pairs whose difference is strictly greater than `params.threshold` become
/// events. The result lists the most recent change first.
///
/// Fewer than two summaries, or no qualifying pair, yield an empty list.
pub fn detect_changes(summaries: &[SceneSummary], params: &ChangeParams) -> Vec<ChangeEvent> {
    let mut ordered: Vec<&SceneSummary> = summaries.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let mut events: Vec<ChangeEvent> = ordered
        .windows(2)
        .filter_map(|pair| {
            let (earlier, later) = (pair[0], pair[1]);
            let difference = later.mean_index - earlier.mean_index;
            (difference > params.threshold).then(|| ChangeEvent {
                date_from: earlier.timestamp.date_naive(),
                date_to: later.timestamp.date_naive(),
                difference,
            })
        })
        .collect();

    events.reverse();
    events
}

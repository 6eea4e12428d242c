//! Imagery analysis algorithms
//!
//! - Spectral indices: normalized difference (NDVI from NIR and red)
//! - Quality masking: bit-flag clear-sky masks, mask application
//! - Change detection: significant index rises between consecutive scenes

mod change_detection;
mod indices;
mod masking;

pub use change_detection::{
    detect_changes, ChangeEvent, ChangeParams, SceneSummary, DEFAULT_CHANGE_THRESHOLD,
};
pub use indices::normalized_difference;
pub use masking::{bits_clear, update_mask};

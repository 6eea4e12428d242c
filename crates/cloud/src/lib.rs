//! # fieldcheck cloud
//!
//! Client side of a remote earth-observation service (REOS) and the two
//! analysis pipelines built on it.
//!
//! - [`query`]: computation graph and catalog types sent to the service
//! - [`reos`]: the [`Reos`] trait, implemented by [`HttpReos`] and
//!   [`LocalReos`]
//! - [`session`] / [`auth`]: one-shot startup authentication
//! - [`area`], [`summarizer`], [`changes`]: the pipelines
//! - [`endpoints`]: raw input in, structured reply out

pub mod area;
pub mod auth;
pub mod changes;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod local;
pub mod query;
pub mod reos;
pub mod session;
pub mod summarizer;

pub use area::{compute_area_hectares, AreaResult};
pub use changes::detect_vegetation_changes;
pub use error::{CloudError, Result};
pub use http::{HttpReos, ReosOptions};
pub use local::{AreaMode, LocalReos, LocalScene};
pub use query::{DateRange, Image, Query, QueryOutput, Reducer, SceneFilter, SceneInfo};
pub use reos::Reos;
pub use session::{Session, SessionState};
pub use summarizer::{fetch_summaries, SceneMask, SummaryParams};

//! Interface to a remote earth-observation service (REOS).

use async_trait::async_trait;

use crate::error::Result;
use crate::query::{Query, QueryOutput, SceneFilter, SceneInfo};

/// A remote earth-observation service: a scene catalog plus an evaluator
/// for [`Query`] graphs.
///
/// Implementations must be `Send + Sync` so a single instance can serve
/// concurrent requests. Each call is one round trip; implementations do
/// not retry.
#[async_trait]
pub trait Reos: Send + Sync {
    /// List the catalog scenes matching `filter`, in catalog order.
    async fn list_scenes(&self, filter: &SceneFilter) -> Result<Vec<SceneInfo>>;

    /// Evaluate a complete query graph.
    ///
    /// # Returns
    /// * `Ok(QueryOutput)` - Output variant matching the query kind
    /// * `Err(CloudError)` - Any transport, session or evaluation failure
    async fn evaluate(&self, query: &Query) -> Result<QueryOutput>;
}

//! The capability interface every cost source implements (§9 design note:
//! "subprocess as polymorphism mechanism" — the plugin side of this stays
//! out-of-process; this trait is the in-process seam the router dispatches
//! through, replacing the source's language-level polymorphism trick with
//! idiomatic dynamic dispatch at the router boundary only).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::descriptor::{CostQuery, CostResult, CostSample, ResourceDescriptor};
use crate::error::CoreError;

/// A `Plugin | LocalSpec` source the router can try for a descriptor. The
/// `none` candidate has no implementation of this trait — it is a router
/// terminal, not a source.
///
/// `cancel` threads the engine's single run-level cancellation token (§5)
/// through to every outbound call; a source that makes no suspension point
/// of its own (e.g. the local spec, a synchronous file lookup) may ignore
/// it.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// The adapter tag this source stamps onto a winning `CostResult`.
    fn name(&self) -> &str;

    /// C1: does this source claim the descriptor?
    fn matches(&self, descriptor: &ResourceDescriptor) -> bool;

    async fn projected_cost(
        &self,
        query: &CostQuery,
        cancel: &CancellationToken,
    ) -> Result<CostResult, CoreError>;

    async fn actual_cost(
        &self,
        query: &CostQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<CostSample>, CoreError>;
}

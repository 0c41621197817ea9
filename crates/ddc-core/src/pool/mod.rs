use std::collections::BTreeSet;

use async_trait::async_trait;
use ddc_model::TaskId;
use tokio_util::sync::CancellationToken;

/// Registry of locally running tasks driven by the reconciliation loop.
///
/// Implementations must keep at most one running process per [`TaskId`].
#[async_trait]
pub trait TaskPool: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start `command` for `id` and wait until it ends.
    ///
    /// Starting an id that is already running is a successful no-op.
    /// The process is killed when `cancel` fires.
    async fn start(
        &self,
        id: TaskId,
        command: String,
        args: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<(), Self::Error>;

    /// Kill the process for `id` and drop it from the registry.
    ///
    /// The entry is removed even when an error is returned.
    async fn stop(&self, id: &TaskId) -> Result<(), Self::Error>;

    /// Snapshot of currently running task ids.
    fn list(&self) -> BTreeSet<TaskId>;
}

//! Contract of the remote control plane.
//!
//! The reconciliation loop owns retry policy; implementations perform exactly one request per call.

use async_trait::async_trait;
use ddc_model::{DesiredTasks, TaskId};

#[async_trait]
pub trait ControlPlane: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Register (or re-register) this agent instance and return a fresh bearer token.
    async fn register(&self, client_id: &str) -> Result<String, Self::Error>;

    /// Fetch the desired task set.
    ///
    /// `active` lists tasks currently running locally. It is a hint for the control plane, not a correctness requirement.
    async fn fetch_desired_tasks(
        &self,
        token: &str,
        active: &[TaskId],
    ) -> Result<DesiredTasks, Self::Error>;
}

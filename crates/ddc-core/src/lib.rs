pub mod error;
pub use error::CoreError;

pub mod plane;
pub use plane::ControlPlane;

pub mod pool;
pub use pool::TaskPool;

pub mod credential;
pub use credential::{Credential, CredentialError, CredentialState};

pub mod acquire;
pub use acquire::{Acquisition, TokenAcquirer};

pub mod plan;
pub use plan::{ReconcilePlan, plan};

pub mod config;
pub use config::{AgentConfig, ConfigError, ReconcileConfig};

pub mod reconcile;
pub use reconcile::Reconciler;

mod system;
pub use system::{arch, cpu_count, new_client_id, platform};

#[cfg(test)]
pub(crate) mod testing;

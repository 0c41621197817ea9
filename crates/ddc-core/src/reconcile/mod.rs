//! The agent's control loop.
//!
//! One [`Reconciler`] owns the credential, the poll clock and the shared task cancellation token.
//! Every iteration it checks for shutdown, refreshes the credential when needed,
//! fetches the desired set once the polling interval has elapsed, and converges the pool to it.

use std::sync::Arc;

use ddc_model::{SupportedTypes, Task, TaskId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    ControlPlane, CoreError, TaskPool,
    acquire::{Acquisition, TokenAcquirer},
    config::ReconcileConfig,
    credential::{CredentialState, unix_now},
    plan::{ReconcilePlan, plan},
    system::new_client_id,
};

pub struct Reconciler<C, P> {
    client: Arc<C>,
    pool: Arc<P>,
    cfg: ReconcileConfig,
    supported: SupportedTypes,
    client_id: String,
    acquirer: TokenAcquirer,
    credential: CredentialState,
    last_poll: Option<Instant>,
    /// Parent of every started task's cancellation token.
    tasks: CancellationToken,
    shutdown: CancellationToken,
}

impl<C, P> Reconciler<C, P>
where
    C: ControlPlane,
    P: TaskPool,
{
    /// Create a loop that stops once `shutdown` is cancelled.
    pub fn new(
        client: Arc<C>,
        pool: Arc<P>,
        cfg: ReconcileConfig,
        supported: SupportedTypes,
        shutdown: CancellationToken,
    ) -> Self {
        let acquirer = TokenAcquirer::new(cfg.token_retries, cfg.token_retry_delay);
        Self {
            client,
            pool,
            cfg,
            supported,
            client_id: new_client_id(),
            acquirer,
            credential: CredentialState::Absent,
            last_poll: None,
            tasks: CancellationToken::new(),
            shutdown,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn credential(&self) -> &CredentialState {
        &self.credential
    }

    /// Token cancelled when the loop exits; every started task holds a child of it.
    pub fn task_token(&self) -> CancellationToken {
        self.tasks.clone()
    }

    /// Drive the loop until shutdown (`Ok`) or credential exhaustion (`Err`).
    ///
    /// Both exits cancel all started tasks and then sleep the configured grace window.
    pub async fn run(mut self) -> Result<(), CoreError> {
        info!(
            target: "ddc.core.reconcile",
            client_id = %self.client_id,
            polling_interval_s = self.cfg.polling_interval.as_secs(),
            supported_types = ?self.supported.iter().collect::<Vec<_>>(),
            "reconciliation loop started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                info!(target: "ddc.core.reconcile", "shutdown requested, exiting");
                self.drain().await;
                return Ok(());
            }

            if let Err(e) = self.ensure_credential().await {
                error!(
                    target: "ddc.core.reconcile",
                    error = %e,
                    "client registering failed, please check connectivity and restart the agent"
                );
                self.drain().await;
                return Err(e);
            }

            if self.poll_due() {
                self.poll().await;
            }

            tokio::time::sleep(self.cfg.tick).await;
        }
    }

    async fn drain(&self) {
        self.tasks.cancel();
        debug!(
            target: "ddc.core.reconcile",
            grace_ms = self.cfg.exit_timeout.as_millis() as u64,
            "tasks cancelled, waiting for processes to exit"
        );
        tokio::time::sleep(self.cfg.exit_timeout).await;
    }

    async fn ensure_credential(&mut self) -> Result<(), CoreError> {
        if !self
            .credential
            .needs_refresh(unix_now(), self.cfg.access_token_exp_gap)
        {
            return Ok(());
        }
        debug!(
            target: "ddc.core.reconcile",
            from = self.credential.name(),
            "refreshing credential"
        );
        self.credential = CredentialState::Refreshing;

        let outcome = tokio::select! {
            biased;
            // Leave the state as Refreshing; the next iteration observes shutdown first.
            _ = self.shutdown.cancelled() => return Ok(()),
            outcome = self.acquirer.acquire(self.client.as_ref(), &self.client_id) => outcome,
        };

        match outcome {
            Acquisition::Success(cred) => {
                self.credential = CredentialState::Valid(cred);
                Ok(())
            }
            Acquisition::RetriesExhausted { attempts } => {
                self.credential = CredentialState::Fatal;
                Err(CoreError::RetriesExhausted { attempts })
            }
        }
    }

    fn poll_due(&self) -> bool {
        self.last_poll
            .is_none_or(|at| at.elapsed() >= self.cfg.polling_interval)
    }

    async fn poll(&mut self) {
        let Some(cred) = self.credential.credential() else {
            return;
        };
        let active = self.pool.list();
        let hint: Vec<TaskId> = active.iter().cloned().collect();

        let desired = match self.client.fetch_desired_tasks(cred.token(), &hint).await {
            Ok(desired) => desired,
            Err(e) => {
                error!(target: "ddc.core.reconcile", error = %e, "failed to fetch desired tasks");
                return;
            }
        };
        self.last_poll = Some(Instant::now());
        debug!(
            target: "ddc.core.reconcile",
            active = active.len(),
            desired = desired.len(),
            "desired tasks fetched"
        );

        let plan = plan(&active, desired, &self.supported);
        self.apply(plan).await;
    }

    async fn apply(&self, plan: ReconcilePlan) {
        for id in &plan.stop {
            info!(target: "ddc.core.reconcile", task_id = %id, "stopping task");
            if let Err(e) = self.pool.stop(id).await {
                error!(target: "ddc.core.reconcile", task_id = %id, error = %e, "task stop failed");
            }
        }
        for id in &plan.skipped {
            debug!(target: "ddc.core.reconcile", task_id = %id, "unsupported task type, skipping");
        }
        for task in plan.start {
            info!(
                target: "ddc.core.reconcile",
                task_id = %task.id,
                task_type = %task.kind,
                command = %task.command_line(),
                "new task received"
            );
            self.launch(task);
        }
    }

    fn launch(&self, task: Task) {
        let pool = Arc::clone(&self.pool);
        let cancel = self.tasks.child_token();

        tokio::spawn(async move {
            let id = task.id.clone();
            if let Err(e) = pool.start(task.id, task.command, task.args, cancel).await {
                warn!(target: "ddc.core.reconcile", task_id = %id, error = %e, "task start failed");
            }
        });
    }
}

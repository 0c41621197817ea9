//! Registry of running child processes keyed by task id.
//!
//! The map is locked only to check, spawn and insert, or to remove.
//! Waiting for a child runs without the lock, so `start`, `stop` and `list`
//! never block behind a long-running process.

use std::{
    collections::{BTreeSet, HashMap},
    io,
    process::ExitStatus,
    sync::{
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use async_trait::async_trait;
use ddc_core::TaskPool;
use ddc_model::TaskId;
use tokio::{process::Child, sync::oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{ExecError, ExecResult},
    forward::forward_lines,
    util::cmd_program,
};

type KillReply = oneshot::Sender<io::Result<()>>;

/// How a started task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The id was already running; nothing was spawned.
    AlreadyRunning,
    /// The process exited on its own.
    Exited(ExitStatus),
    /// The process was killed through [`ProcessPool::stop`].
    Stopped(ExitStatus),
    /// The process was killed because its cancellation token fired.
    Cancelled,
}

struct ManagedProcess {
    /// Distinguishes this entry from a later process started under the same id.
    generation: u64,
    pid: Option<u32>,
    started_at: Instant,
    kill: oneshot::Sender<KillReply>,
}

#[derive(Default)]
pub struct ProcessPool {
    procs: RwLock<HashMap<TaskId, ManagedProcess>>,
    generation: AtomicU64,
}

impl ProcessPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `command` for `id` and wait for it to end.
    ///
    /// Returns [`Exit::AlreadyRunning`] without spawning if `id` is present.
    /// The entry is inserted before waiting and removed when the process ends,
    /// unless [`stop`](Self::stop) already removed it.
    pub async fn start(
        &self,
        id: TaskId,
        command: &str,
        args: &[String],
        cancel: CancellationToken,
    ) -> ExecResult<Exit> {
        if command.is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let (generation, mut child, kill_rx) = {
            let mut procs = self.write();
            if procs.contains_key(&id) {
                info!(target: "ddc.exec.pool", task_id = %id, ?args, "already started, skipping");
                return Ok(Exit::AlreadyRunning);
            }

            let mut child = cmd_program(command, args)
                .spawn()
                .map_err(|source| ExecError::Spawn {
                    program: command.to_string(),
                    source,
                })?;
            self.attach_output(&id, &mut child);

            let (kill_tx, kill_rx) = oneshot::channel();
            let generation = self.generation.fetch_add(1, Ordering::Relaxed);
            procs.insert(
                id.clone(),
                ManagedProcess {
                    generation,
                    pid: child.id(),
                    started_at: Instant::now(),
                    kill: kill_tx,
                },
            );
            (generation, child, kill_rx)
        };
        info!(target: "ddc.exec.pool", task_id = %id, pid = child.id(), ?args, "started");

        let exit = wait_child(&id, &mut child, kill_rx, &cancel).await;

        if let Some(proc) = self.remove_generation(&id, generation) {
            debug!(
                target: "ddc.exec.pool",
                task_id = %id,
                pid = proc.pid,
                ran_ms = proc.started_at.elapsed().as_millis() as u64,
                "entry removed"
            );
        }
        match &exit {
            Ok(exit) => info!(target: "ddc.exec.pool", task_id = %id, ?exit, "exited"),
            Err(e) => warn!(target: "ddc.exec.pool", task_id = %id, error = %e, "wait failed"),
        }
        exit
    }

    /// Kill the process for `id` immediately and remove its entry.
    ///
    /// The entry is removed before the kill is attempted, so a failed kill never leaves a stale entry.
    /// A process that already exited on its own counts as stopped.
    pub async fn stop(&self, id: &TaskId) -> ExecResult<()> {
        let removed = self.write().remove(id);
        let Some(proc) = removed else {
            return Err(ExecError::UnknownTask(id.clone()));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if proc.kill.send(reply_tx).is_err() {
            debug!(target: "ddc.exec.pool", task_id = %id, "process already exited");
            return Ok(());
        }
        match reply_rx.await {
            Ok(Ok(())) => {
                info!(target: "ddc.exec.pool", task_id = %id, pid = proc.pid, "killed");
                Ok(())
            }
            Ok(Err(source)) => Err(ExecError::Kill {
                id: id.clone(),
                source,
            }),
            // The child exited before the kill request was picked up.
            Err(_) => Ok(()),
        }
    }

    /// Snapshot of running task ids.
    pub fn list(&self) -> BTreeSet<TaskId> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// OS pid of the process running for `id`, if any.
    pub fn pid(&self, id: &TaskId) -> Option<u32> {
        self.read().get(id).and_then(|proc| proc.pid)
    }

    fn attach_output(&self, id: &TaskId, child: &mut Child) {
        if let Some(stdout) = child.stdout.take() {
            let id = id.clone();
            forward_lines(stdout, move |line| {
                info!(target: "ddc.exec.out", task_id = %id, "{line}");
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let id = id.clone();
            forward_lines(stderr, move |line| {
                warn!(target: "ddc.exec.err", task_id = %id, "error: {line}");
            });
        }
    }

    fn remove_generation(&self, id: &TaskId, generation: u64) -> Option<ManagedProcess> {
        let mut procs = self.write();
        match procs.get(id) {
            Some(proc) if proc.generation == generation => procs.remove(id),
            _ => None,
        }
    }

    // The map stays consistent across a panic in another holder, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<TaskId, ManagedProcess>> {
        self.procs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TaskId, ManagedProcess>> {
        self.procs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn wait_child(
    id: &TaskId,
    child: &mut Child,
    kill_rx: oneshot::Receiver<KillReply>,
    cancel: &CancellationToken,
) -> ExecResult<Exit> {
    tokio::select! {
        status = child.wait() => Ok(Exit::Exited(status?)),
        _ = cancel.cancelled() => {
            debug!(target: "ddc.exec.pool", task_id = %id, "cancelled; killing child");
            if let Err(e) = child.kill().await {
                warn!(target: "ddc.exec.pool", task_id = %id, error = %e, "kill on cancel failed");
            }
            Ok(Exit::Cancelled)
        }
        Ok(reply) = kill_rx => {
            let killed = child.start_kill();
            let failed = killed.is_err();
            let _ = reply.send(killed);
            if failed {
                warn!(target: "ddc.exec.pool", task_id = %id, "kill failed, waiting for natural exit");
            }
            Ok(Exit::Stopped(child.wait().await?))
        }
    }
}

#[async_trait]
impl TaskPool for ProcessPool {
    type Error = ExecError;

    async fn start(
        &self,
        id: TaskId,
        command: String,
        args: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<(), ExecError> {
        ProcessPool::start(self, id, &command, &args, cancel)
            .await
            .map(|_| ())
    }

    async fn stop(&self, id: &TaskId) -> Result<(), ExecError> {
        ProcessPool::stop(self, id).await
    }

    fn list(&self) -> BTreeSet<TaskId> {
        ProcessPool::list(self)
    }
}

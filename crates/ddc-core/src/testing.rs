//! Fakes shared by unit tests of this crate.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use ddc_model::{DesiredTasks, Task, TaskId};
use tokio_util::sync::CancellationToken;

use crate::{ControlPlane, TaskPool, credential::unix_now};

#[derive(Debug, thiserror::Error)]
#[error("fake failure: {0}")]
pub struct FakeError(pub &'static str);

pub fn token_with_exp(exp: i64) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}

pub fn long_lived_token() -> String {
    token_with_exp(unix_now() + 24 * 3600)
}

pub fn task(id: &str, kind: &str) -> Task {
    Task {
        id: TaskId::from(id),
        kind: kind.to_string(),
        command: kind.to_string(),
        args: vec!["--target".into(), "10.0.0.1".into()],
    }
}

pub fn desired(tasks: impl IntoIterator<Item = Task>) -> DesiredTasks {
    tasks.into_iter().map(|t| (t.id.clone(), t)).collect()
}

/// Scripted control plane. Once a script is drained the last behaviour repeats:
/// registration hands out long-lived tokens and fetches return `fallback_tasks`.
#[derive(Default)]
pub struct FakePlane {
    pub registrations: Mutex<VecDeque<Result<String, FakeError>>>,
    pub fetches: Mutex<VecDeque<Result<DesiredTasks, FakeError>>>,
    pub fallback_tasks: Mutex<DesiredTasks>,
    pub register_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub client_ids: Mutex<Vec<String>>,
    pub hints: Mutex<Vec<Vec<TaskId>>>,
}

impl FakePlane {
    pub fn with_registrations(script: impl IntoIterator<Item = Result<String, FakeError>>) -> Self {
        Self {
            registrations: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn serving(tasks: DesiredTasks) -> Self {
        Self {
            fallback_tasks: Mutex::new(tasks),
            ..Default::default()
        }
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for FakePlane {
    type Error = FakeError;

    async fn register(&self, client_id: &str) -> Result<String, FakeError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.client_ids.lock().unwrap().push(client_id.to_string());
        self.registrations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(long_lived_token()))
    }

    async fn fetch_desired_tasks(
        &self,
        _token: &str,
        active: &[TaskId],
    ) -> Result<DesiredTasks, FakeError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.hints.lock().unwrap().push(active.to_vec());
        match self.fetches.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.fallback_tasks.lock().unwrap().clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolCall {
    Start(TaskId),
    Stop(TaskId),
}

/// Pool that records calls and tracks membership without spawning anything.
#[derive(Default)]
pub struct FakePool {
    pub active: Mutex<BTreeSet<TaskId>>,
    pub calls: Mutex<Vec<PoolCall>>,
}

impl FakePool {
    pub fn with_active(ids: &[&str]) -> Self {
        Self {
            active: Mutex::new(ids.iter().map(|id| TaskId::from(*id)).collect()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<PoolCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskPool for FakePool {
    type Error = FakeError;

    async fn start(
        &self,
        id: TaskId,
        _command: String,
        _args: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<(), FakeError> {
        self.calls.lock().unwrap().push(PoolCall::Start(id.clone()));
        if !self.active.lock().unwrap().insert(id.clone()) {
            return Ok(());
        }
        cancel.cancelled().await;
        self.active.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn stop(&self, id: &TaskId) -> Result<(), FakeError> {
        self.calls.lock().unwrap().push(PoolCall::Stop(id.clone()));
        if self.active.lock().unwrap().remove(id) {
            Ok(())
        } else {
            Err(FakeError("unknown task"))
        }
    }

    fn list(&self) -> BTreeSet<TaskId> {
        self.active.lock().unwrap().clone()
    }
}

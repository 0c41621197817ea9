use async_trait::async_trait;
use reqwest::{StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use ddc_core::{ControlPlane, cpu_count};
use ddc_model::{DesiredTasks, Task, TaskId};

use crate::{config::ClientConfig, errors::ClientError};

const REGISTER_ENDPOINT: &str = "register";
const TASKS_ENDPOINT: &str = "tasks";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    id: &'a str,
    cpu_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TasksRequest<'a> {
    active_tasks: &'a [TaskId],
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(rename = "hydra:member", default)]
    tasks: Vec<Task>,
}

/// Control plane reached over HTTP/JSON.
///
/// Connections are not kept alive between polls.
pub struct HttpControlPlane {
    base_url: String,
    http: reqwest::Client,
}

impl HttpControlPlane {
    pub fn new(cfg: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    type Error = ClientError;

    async fn register(&self, client_id: &str) -> Result<String, ClientError> {
        let body = serde_json::to_vec(&RegisterRequest {
            id: client_id,
            cpu_count: cpu_count(),
        })?;
        debug!(target: "ddc.client", client_id, "registering client");

        let response = self
            .http
            .post(format!("{}/api/registrations/{}", self.base_url, client_id))
            .header(CONTENT_TYPE, "application/ld+json")
            .body(body)
            .send()
            .await?;

        let parsed: RegisterResponse = decode(response, REGISTER_ENDPOINT).await?;
        if parsed.access_token.is_empty() {
            return Err(ClientError::InvalidResponse("empty access token".into()));
        }
        Ok(parsed.access_token)
    }

    async fn fetch_desired_tasks(
        &self,
        token: &str,
        active: &[TaskId],
    ) -> Result<DesiredTasks, ClientError> {
        trace!(target: "ddc.client", active = active.len(), "fetching desired tasks");

        let response = self
            .http
            .get(format!("{}/api/tasks", self.base_url))
            .bearer_auth(token)
            .json(&TasksRequest {
                active_tasks: active,
            })
            .send()
            .await?;

        let parsed: TasksResponse = decode(response, TASKS_ENDPOINT).await?;
        Ok(parsed
            .tasks
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect())
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &'static str,
) -> Result<T, ClientError> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            endpoint,
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        ClientError::InvalidResponse(format!("failed to parse {endpoint} response: {e}, body: {body}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
    };
    use serde_json::{Value, json};

    #[derive(Default)]
    struct Seen {
        register_path_id: Option<String>,
        register_body: Option<Value>,
        register_content_type: Option<String>,
        authorization: Option<String>,
        tasks_body: Option<Value>,
    }

    type Shared = Arc<Mutex<Seen>>;

    async fn register(
        State(seen): State<Shared>,
        Path(id): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Json<Value> {
        let mut seen = seen.lock().unwrap();
        seen.register_path_id = Some(id);
        seen.register_body = serde_json::from_slice(&body).ok();
        seen.register_content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Json(json!({ "accessToken": "h.p.s" }))
    }

    async fn tasks(State(seen): State<Shared>, headers: HeaderMap, body: Bytes) -> Json<Value> {
        let mut seen = seen.lock().unwrap();
        seen.authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.tasks_body = serde_json::from_slice(&body).ok();
        Json(json!({
            "@context": "/api/contexts/Task",
            "hydra:member": [
                { "id": "task-1", "type": "hping3", "cmd": "hping3", "args": ["-S", "10.0.0.1"] },
                { "id": "task-2", "type": "slowhttptest", "cmd": "slowhttptest", "args": [] }
            ],
            "hydra:totalItems": 2
        }))
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn fake_control_plane() -> (HttpControlPlane, Shared) {
        let seen: Shared = Arc::default();
        let router = Router::new()
            .route("/api/registrations/{id}", post(register))
            .route("/api/tasks", get(tasks))
            .with_state(Arc::clone(&seen));
        let url = serve(router).await;
        let client = HttpControlPlane::new(ClientConfig::new(format!("{url}/"))).unwrap();
        (client, seen)
    }

    #[tokio::test]
    async fn register_posts_client_id_and_returns_token() {
        let (client, seen) = fake_control_plane().await;

        let token = client.register("client-42").await.unwrap();

        assert_eq!(token, "h.p.s");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.register_path_id.as_deref(), Some("client-42"));
        assert_eq!(
            seen.register_content_type.as_deref(),
            Some("application/ld+json")
        );
        let body = seen.register_body.as_ref().unwrap();
        assert_eq!(body["id"], "client-42");
        assert!(body["cpuCount"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn fetch_sends_bearer_and_hint_and_keys_by_id() {
        let (client, seen) = fake_control_plane().await;

        let desired = client
            .fetch_desired_tasks("tok", &[TaskId::from("task-1")])
            .await
            .unwrap();

        assert_eq!(desired.len(), 2);
        assert_eq!(desired["task-1"].args, vec!["-S", "10.0.0.1"]);
        assert_eq!(desired["task-2"].kind, "slowhttptest");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
        assert_eq!(
            seen.tasks_body.as_ref().unwrap(),
            &json!({ "activeTasks": ["task-1"] })
        );
    }

    #[tokio::test]
    async fn non_ok_status_is_an_error() {
        let router = Router::new()
            .route(
                "/api/registrations/{id}",
                post(|| async { (AxumStatus::FORBIDDEN, "nope") }),
            )
            .route(
                "/api/tasks",
                get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let client = HttpControlPlane::new(ClientConfig::new(serve(router).await)).unwrap();

        let err = client.register("c").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedStatus { status: 403, endpoint: REGISTER_ENDPOINT }
        ));

        let err = client.fetch_desired_tasks("t", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let router = Router::new().route("/api/tasks", get(|| async { "not json" }));
        let client = HttpControlPlane::new(ClientConfig::new(serve(router).await)).unwrap();

        let err = client.fetch_desired_tasks("t", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn missing_member_list_means_no_tasks() {
        let router = Router::new().route("/api/tasks", get(|| async { Json(json!({})) }));
        let client = HttpControlPlane::new(ClientConfig::new(serve(router).await)).unwrap();

        let desired = client.fetch_desired_tasks("t", &[]).await.unwrap();
        assert!(desired.is_empty());
    }

    #[tokio::test]
    async fn unreachable_control_plane_is_request_error() {
        let client = HttpControlPlane::new(ClientConfig::new("http://127.0.0.1:1")).unwrap();
        let err = client.register("c").await.unwrap_err();
        assert!(matches!(err, ClientError::HttpRequest(_)));
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: &'static str },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

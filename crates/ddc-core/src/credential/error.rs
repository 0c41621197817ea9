use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("wrong access token format: expected 3 segments, got {segments}")]
    WrongFormat { segments: usize },

    #[error("access token payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("access token claims are malformed: {0}")]
    Claims(#[from] serde_json::Error),
}

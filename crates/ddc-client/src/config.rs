use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control plane base URL, e.g. `https://cp.example.com`.
    pub base_url: String,
    /// Whole-request timeout, also bounds waiting for response headers.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

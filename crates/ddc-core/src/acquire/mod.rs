use std::time::Duration;

use tracing::{error, info, warn};

use crate::{ControlPlane, credential::Credential};

/// Outcome of a bounded credential acquisition.
#[derive(Debug)]
pub enum Acquisition {
    Success(Credential),
    RetriesExhausted { attempts: u32 },
}

/// Obtains credentials with a fixed-delay, fixed-budget retry policy.
///
/// `retries` counts retries after the first attempt, so at most `retries + 1` registrations are made per call.
/// A token whose payload cannot be decoded counts as a failed attempt.
#[derive(Debug, Clone)]
pub struct TokenAcquirer {
    retries: u32,
    delay: Duration,
    failures: u32,
}

impl TokenAcquirer {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            delay,
            failures: 0,
        }
    }

    /// Consecutive failed attempts since the last success.
    #[inline]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub async fn acquire<C>(&mut self, client: &C, client_id: &str) -> Acquisition
    where
        C: ControlPlane + ?Sized,
    {
        loop {
            let attempt = self.failures + 1;
            let reason = match client.register(client_id).await {
                Ok(token) => match Credential::parse(token) {
                    Ok(cred) => {
                        self.failures = 0;
                        info!(
                            target: "ddc.core.credential",
                            attempt,
                            expires_at = cred.expires_at(),
                            "client registered"
                        );
                        return Acquisition::Success(cred);
                    }
                    Err(e) => format!("malformed access token: {e}"),
                },
                Err(e) => e.to_string(),
            };

            if self.failures >= self.retries {
                error!(
                    target: "ddc.core.credential",
                    attempt,
                    %reason,
                    "client registering failed, retry budget exhausted"
                );
                return Acquisition::RetriesExhausted { attempts: attempt };
            }

            self.failures += 1;
            warn!(
                target: "ddc.core.credential",
                attempt,
                retry_in_ms = self.delay.as_millis() as u64,
                %reason,
                "failed to register client, retrying"
            );
            tokio::time::sleep(self.delay).await;
        }
    }
}

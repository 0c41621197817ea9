//! Bearer credential issued by the control plane.
//!
//! Tokens are JWT-shaped (`header.payload.signature`). Only the `exp` claim of the payload is read;
//! the signature is the control plane's business and is never verified here.

mod error;
pub use error::CredentialError;

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// A decoded bearer token together with its expiry (unix seconds).
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: i64,
}

impl Credential {
    /// Decode the expiry claim of `token`.
    ///
    /// Fails if the token does not have three segments, the payload is not base64,
    /// or the payload is not a JSON object with an integer `exp`.
    pub fn parse(token: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(CredentialError::WrongFormat {
                segments: segments.len(),
            });
        }

        let payload = decode_segment(segments[1])?;
        let claims: Claims = serde_json::from_slice(&payload)?;

        Ok(Self {
            expires_at: claims.exp,
            token,
        })
    }

    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[inline]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// `true` once `now` is within `gap` of the expiry, i.e. `now >= exp - gap`.
    pub fn is_expired_at(&self, now: i64, gap: Duration) -> bool {
        let gap = i64::try_from(gap.as_secs()).unwrap_or(i64::MAX);
        now >= self.expires_at.saturating_sub(gap)
    }

    pub fn is_expired(&self, gap: Duration) -> bool {
        self.is_expired_at(unix_now(), gap)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Credential lifecycle as seen by the reconciliation loop.
#[derive(Debug, Clone, Default)]
pub enum CredentialState {
    /// No token has been acquired yet.
    #[default]
    Absent,
    /// A token is held and not yet inside the expiry gap.
    Valid(Credential),
    /// Acquisition is in progress.
    Refreshing,
    /// The retry budget was exhausted. Terminal.
    Fatal,
}

impl CredentialState {
    /// Whether the loop has to acquire a token before doing anything else.
    pub fn needs_refresh(&self, now: i64, gap: Duration) -> bool {
        match self {
            CredentialState::Absent | CredentialState::Refreshing => true,
            CredentialState::Valid(cred) => cred.is_expired_at(now, gap),
            CredentialState::Fatal => false,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            CredentialState::Valid(cred) => Some(cred),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CredentialState::Absent => "absent",
            CredentialState::Valid(_) => "valid",
            CredentialState::Refreshing => "refreshing",
            CredentialState::Fatal => "fatal",
        }
    }
}

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// JWTs use unpadded url-safe base64, some issuers emit the standard alphabet instead.
fn decode_segment(segment: &str) -> Result<Vec<u8>, CredentialError> {
    let trimmed = segment.trim_end_matches('=');
    general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(trimmed))
        .map_err(CredentialError::from)
}

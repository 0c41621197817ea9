mod error;
pub use error::ConfigError;

use std::{str::FromStr, time::Duration};

use ddc_model::SupportedTypes;

pub const ENV_API_URL: &str = "DD_API_URL";
pub const ENV_SUPPORTED_TYPES: &str = "SUPPORTED_TYPES";
pub const ENV_POLLING_INTERVAL: &str = "DD_POLLING_INTERVAL";
pub const ENV_EXIT_TIMEOUT: &str = "DD_EXIT_TIMEOUT";
pub const ENV_TOKEN_RETRIES: &str = "DD_TOKEN_RETRIES";
pub const ENV_TOKEN_RETRY_DELAY: &str = "DD_TOKEN_RETRY_DELAY";
pub const ENV_TOKEN_EXP_GAP: &str = "DD_TOKEN_EXP_GAP";
pub const ENV_REQUEST_TIMEOUT: &str = "DD_REQUEST_TIMEOUT";
pub const ENV_LOG_LEVEL: &str = "DD_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "DD_LOG_FORMAT";

/// Timing and retry parameters of the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Minimum time between two successful fetches of the desired task set.
    pub polling_interval: Duration,
    /// Grace window slept after cancelling tasks on shutdown or fatal error.
    pub exit_timeout: Duration,
    /// Retries after the first failed registration before giving up.
    pub token_retries: u32,
    /// Fixed delay between registration attempts.
    pub token_retry_delay: Duration,
    /// Refresh the credential once it is this close to expiry.
    pub access_token_exp_gap: Duration,
    /// Loop sleep between iterations. Bounds shutdown latency.
    pub tick: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(10),
            exit_timeout: Duration::from_secs(5),
            token_retries: 3,
            token_retry_delay: Duration::from_secs(3),
            access_token_exp_gap: Duration::from_secs(60),
            tick: Duration::from_millis(100),
        }
    }
}

/// Full agent configuration, read from the process environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Control plane base URL, without trailing slash.
    pub api_url: String,
    pub supported_types: SupportedTypes,
    pub request_timeout: Duration,
    pub log_level: String,
    pub log_format: String,
    pub reconcile: ReconcileConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            supported_types: SupportedTypes::all(),
            request_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = AgentConfig::default();

        if let Some(url) = get(ENV_API_URL) {
            cfg.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(types) = get(ENV_SUPPORTED_TYPES) {
            cfg.supported_types = SupportedTypes::parse(&types);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            cfg.log_level = level.trim().to_string();
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            cfg.log_format = format.trim().to_string();
        }

        let secs = |key: &'static str, slot: &mut Duration| -> Result<(), ConfigError> {
            if let Some(raw) = get(key) {
                *slot = Duration::from_secs(parse_num(key, &raw)?);
            }
            Ok(())
        };
        secs(ENV_REQUEST_TIMEOUT, &mut cfg.request_timeout)?;
        secs(ENV_POLLING_INTERVAL, &mut cfg.reconcile.polling_interval)?;
        secs(ENV_EXIT_TIMEOUT, &mut cfg.reconcile.exit_timeout)?;
        secs(ENV_TOKEN_RETRY_DELAY, &mut cfg.reconcile.token_retry_delay)?;
        secs(ENV_TOKEN_EXP_GAP, &mut cfg.reconcile.access_token_exp_gap)?;
        if let Some(raw) = get(ENV_TOKEN_RETRIES) {
            cfg.reconcile.token_retries = parse_num(ENV_TOKEN_RETRIES, &raw)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.is_empty() {
            return Err(ConfigError::Missing(ENV_API_URL));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.api_url.clone()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: ENV_REQUEST_TIMEOUT,
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn parse_num<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

//! Global `tracing` subscriber setup for the agent.
//!
//! Child process output arrives on the `ddc.exec.out` / `ddc.exec.err` targets,
//! so a directive such as `info,ddc.exec.out=warn` silences chatty tasks without hiding agent logs.

mod config;
mod error;

pub use config::{LoggerConfig, LoggerFormat};
pub use error::LoggerError;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, fmt::time::OffsetTime, layer::Layered, layer::SubscriberExt,
    util::SubscriberInitExt,
};

type Filtered = Layered<EnvFilter, Registry>;

/// Install the subscriber described by `cfg` as the process-wide default.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when a default is already set.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let base = tracing_subscriber::registry().with(directive(&cfg.level)?);
    match cfg.format {
        LoggerFormat::Text => base
            .with(
                fmt::layer()
                    .with_ansi(cfg.use_color)
                    .with_target(cfg.with_targets)
                    .with_timer(local_timer()),
            )
            .try_init()
            .map_err(LoggerError::from_init),
        LoggerFormat::Json => base
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_target(cfg.with_targets)
                    .with_timer(local_timer()),
            )
            .try_init()
            .map_err(LoggerError::from_init),
        LoggerFormat::Journald => journald(base),
    }
}

pub(crate) fn directive(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|e| LoggerError::InvalidLevel {
        directive: level.to_string(),
        reason: e.to_string(),
    })
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(base: Filtered) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::JournaldUnavailable(e.to_string()))?
        .with_syslog_identifier("ddc-agentd".to_string());
    base.with(layer).try_init().map_err(LoggerError::from_init)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_base: Filtered) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldUnavailable(
        "built without the `journald` feature or not on linux".to_string(),
    ))
}

use std::{fmt, io::IsTerminal, str::FromStr};

use crate::logger::{directive, error::LoggerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human-readable lines with RFC3339 local timestamps.
    Text,
    /// One flattened JSON object per event.
    Json,
    /// Native systemd journal fields (linux, `journald` feature).
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" => Ok(LoggerFormat::Journald),
            _ => Err(LoggerError::InvalidFormat(s.trim().to_string())),
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `"info"` or `"info,ddc.exec.out=warn"`.
    pub level: String,
    pub with_targets: bool,
    /// ANSI colors for the text format. Defaults to on when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    /// Validate textual settings before anything is installed.
    pub fn parse(level: &str, format: &str) -> Result<Self, LoggerError> {
        let format = format.parse()?;
        directive(level)?;
        Ok(Self {
            format,
            level: level.trim().to_string(),
            ..Default::default()
        })
    }
}

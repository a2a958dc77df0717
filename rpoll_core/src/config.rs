use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;

use crate::logger::parse_level;
use crate::os::BackendKind;

/// Poll runtime configuration (simple key=value format).
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// `None` picks the best backend for the target.
    pub backend: Option<BackendKind>,
    pub log_level: LevelFilter,
    /// Default timeout for callers that do not pass one; `-1` blocks.
    pub timeout_ms: i64,
    /// Report build/wait/collect steps through the log tracer.
    pub trace: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig { backend: None, log_level: LevelFilter::Warn, timeout_ms: -1, trace: false }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    InvalidFormat(String),
    InvalidValue { key: &'static str, value: String },
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io: {}", e),
            ConfigError::InvalidFormat(line) => write!(f, "invalid config line: {}", line),
            ConfigError::InvalidValue { key, value } => write!(f, "invalid value for {}: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl PollConfig {
    /// Load configuration from a key=value file.
    /// Example:
    /// backend=emulated
    /// log_level=debug
    /// timeout_ms=250
    /// trace=true
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }
}

impl FromStr for PollConfig {
    type Err = ConfigError;

    /// Missing keys keep their defaults; unknown keys are rejected.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut cfg = PollConfig::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, val) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => return Err(ConfigError::InvalidFormat(line.to_string())),
            };

            match key {
                "backend" => {
                    cfg.backend = if val.eq_ignore_ascii_case("auto") {
                        None
                    } else {
                        Some(val.parse::<BackendKind>().map_err(|_| invalid("backend", val))?)
                    };
                }
                "log_level" => cfg.log_level = parse_level(val).ok_or_else(|| invalid("log_level", val))?,
                "timeout_ms" => cfg.timeout_ms = val.parse::<i64>().map_err(|_| invalid("timeout_ms", val))?,
                "trace" => cfg.trace = parse_bool(val).ok_or_else(|| invalid("trace", val))?,
                _ => return Err(ConfigError::InvalidFormat(line.to_string())),
            }
        }

        Ok(cfg)
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue { key, value: value.to_string() }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

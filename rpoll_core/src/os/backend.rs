//! Common trait implemented by every readiness backend.

use std::fmt;
use std::str::FromStr;

use libc::c_int;

use super::table::PollTable;
use crate::error::Result;

pub trait Backend: Send + Sync {
    /// Short name used in traces and configuration.
    fn name(&self) -> &'static str;

    /// Block until an entry of `table` is ready, the timeout expires, or a
    /// signal arrives. Fills `revents` in place and returns how many entries
    /// have a nonzero `revents`.
    ///
    /// `timeout_ms < 0` waits indefinitely, `0` only samples current state.
    fn wait(&self, table: &mut PollTable, timeout_ms: c_int) -> Result<usize>;
}

/// Which backend implementation to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// `poll(2)`.
    Native,
    /// `poll(2)` semantics rebuilt on `select(2)`.
    Emulated,
}

impl BackendKind {
    /// Best backend compiled in for this target.
    pub fn detect() -> Option<BackendKind> {
        if cfg!(unix) {
            Some(BackendKind::Native)
        } else {
            None
        }
    }

    /// Instantiate the backend, or `NotImplemented` when the target lacks it.
    pub fn instantiate(self) -> Result<Box<dyn Backend>> {
        instantiate(self)
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn instantiate(kind: BackendKind) -> Result<Box<dyn Backend>> {
            let backend: Box<dyn Backend> = match kind {
                BackendKind::Native => Box::new(super::NativeBackend),
                BackendKind::Emulated => Box::new(super::EmulatedBackend),
            };
            Ok(backend)
        }
    } else {
        fn instantiate(_kind: BackendKind) -> Result<Box<dyn Backend>> {
            Err(crate::error::Error::NotImplemented)
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Emulated => write!(f, "emulated"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "poll" => Ok(BackendKind::Native),
            "emulated" | "select" => Ok(BackendKind::Emulated),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

use std::fmt;
use std::io;

use crate::os::RawFd;

/// Failure modes of a single poll call.
#[derive(Debug)]
pub enum Error {
    /// Malformed call: bad raw mask, timeout outside the native range.
    InvalidArgument(String),
    /// The handle at `position` did not resolve to an open descriptor.
    InvalidHandle { position: usize, fd: Option<RawFd> },
    /// The wait was interrupted by a signal before anything became ready.
    PollInterrupted,
    /// The OS rejected the wait.
    PollError(io::Error),
    /// No backend exists for this platform.
    NotImplemented,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify the errno left behind by a failed wait.
    pub(crate) fn from_wait(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            return Error::PollInterrupted;
        }
        #[cfg(target_os = "linux")]
        if err.raw_os_error() == Some(libc::ERESTART) {
            return Error::PollInterrupted;
        }
        Error::PollError(err)
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::PollInterrupted)
    }

    /// errno of an OS-level failure, if this is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::PollError(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::InvalidHandle { position, fd: Some(fd) } => {
                write!(f, "invalid handle at position {} (fd {})", position, fd)
            }
            Error::InvalidHandle { position, fd: None } => {
                write!(f, "invalid handle at position {} (no descriptor)", position)
            }
            Error::PollInterrupted => write!(f, "poll interrupted by signal"),
            Error::PollError(e) => write!(f, "poll error: {}", e),
            Error::NotImplemented => write!(f, "poll is not implemented on this platform"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::PollError(e) => Some(e),
            _ => None,
        }
    }
}

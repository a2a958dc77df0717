//! `poll(2)` for handle lists: hand over (handle, interest) pairs and a
//! timeout, get back the handles that became ready and what happened to them.
//!
//! ```no_run
//! use std::os::unix::net::UnixStream;
//! use rpoll_core::{poll, EventMask, WatchEntry};
//!
//! let (a, b) = UnixStream::pair()?;
//! let watch = [WatchEntry::new(&a, EventMask::IN), WatchEntry::new(&b, EventMask::OUT)];
//! for (_, events) in poll(&watch, 250)?.iter() {
//!     println!("ready: {}", events);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod os;
pub mod poll;
#[cfg(unix)]
pub mod signals;

pub use config::{ConfigError, PollConfig};
pub use error::{Error, Result};
pub use os::{Backend, BackendKind, Descriptor, EventMask, FdResolver, Resolver, ResultSet, WatchEntry};
pub use poll::{poll, Poll};

//! OS readiness layer: poll table, backends (poll/select) and result assembly.
//!
//! The backend is selected once when a `Poll` is constructed:
//! Unix → `poll(2)` (with a `select(2)` emulation available on request),
//! others → a stub that reports `NotImplemented`.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        pub use std::os::unix::io::RawFd;

        mod native;
        mod emulated;
        pub use native::NativeBackend;
        pub use emulated::EmulatedBackend;
    } else {
        /// Raw descriptor number as used by the C runtime.
        pub type RawFd = libc::c_int;
    }
}

mod backend;
mod mask;
mod resolve;
mod table;
mod unsupported;

pub use backend::{Backend, BackendKind};
pub use mask::EventMask;
pub use resolve::{Descriptor, FdResolver, Resolver};
pub use table::{build, collect, PollFd, PollTable, ResultSet, WatchEntry};
pub use unsupported::UnsupportedBackend;

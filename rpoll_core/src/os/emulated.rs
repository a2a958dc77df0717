//! `poll(2)` semantics on top of `select(2)`.
//!
//! Only `IN`, `OUT` and `ERR` map onto the read/write/exceptional sets.
//! Other flags may be requested but are never reported.

use std::io::Error as IoError;
use std::mem::MaybeUninit;
use std::ptr;

use libc::c_int;
use log::{debug, warn};

use super::backend::Backend;
use super::mask::EventMask;
use super::table::PollTable;
use super::RawFd;
use crate::error::{Error, Result};

/// `select(2)` backend.
///
/// A table where no entry asks for `IN`, `OUT` or `ERR` leaves every set
/// empty. The wait then only ends on the timeout or a signal, so with a
/// negative timeout it sleeps until interrupted.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmulatedBackend;

/// One of the three descriptor sets. A set nobody was added to is handed to
/// `select` as a null pointer.
struct FdSet {
    set: libc::fd_set,
    used: bool,
}

impl FdSet {
    fn new() -> Self {
        let mut set = MaybeUninit::<libc::fd_set>::uninit();
        // SAFETY: FD_ZERO initialises the whole set.
        let set = unsafe {
            libc::FD_ZERO(set.as_mut_ptr());
            set.assume_init()
        };
        FdSet { set, used: false }
    }

    fn insert(&mut self, fd: RawFd) {
        // SAFETY: callers check `fits_fd_set(fd)` first.
        unsafe { libc::FD_SET(fd, &mut self.set) };
        self.used = true;
    }

    fn contains(&self, fd: RawFd) -> bool {
        // SAFETY: as for `insert`.
        self.used && unsafe { libc::FD_ISSET(fd, &self.set) }
    }

    fn as_mut_ptr(&mut self) -> *mut libc::fd_set {
        if self.used {
            &mut self.set as *mut libc::fd_set
        } else {
            ptr::null_mut()
        }
    }
}

fn fits_fd_set(fd: RawFd) -> bool {
    fd >= 0 && (fd as usize) < libc::FD_SETSIZE as usize
}

/// Millisecond timeout → `struct timeval`. Negative means "no timeout" and
/// must become a null pointer, never a zero timeval.
fn to_timeval(timeout_ms: c_int) -> Option<libc::timeval> {
    if timeout_ms < 0 {
        return None;
    }
    Some(libc::timeval {
        tv_sec: (timeout_ms / 1000) as libc::time_t,
        tv_usec: ((timeout_ms % 1000) * 1000) as libc::suseconds_t,
    })
}

impl Backend for EmulatedBackend {
    fn name(&self) -> &'static str {
        "emulated"
    }

    fn wait(&self, table: &mut PollTable, timeout_ms: c_int) -> Result<usize> {
        let mut read = FdSet::new();
        let mut write = FdSet::new();
        let mut except = FdSet::new();
        let mut max_fd: RawFd = -1;

        for (position, pfd) in table.entries().iter().enumerate() {
            // nothing select can watch: the entry just never becomes ready
            if !pfd.events.intersects(EventMask::SELECTABLE) {
                continue;
            }
            if !fits_fd_set(pfd.fd) {
                return Err(Error::InvalidHandle { position, fd: Some(pfd.fd) });
            }
            max_fd = max_fd.max(pfd.fd);
            if pfd.events.contains(EventMask::IN) {
                read.insert(pfd.fd);
            }
            if pfd.events.contains(EventMask::OUT) {
                write.insert(pfd.fd);
            }
            if pfd.events.contains(EventMask::ERR) {
                except.insert(pfd.fd);
            }
        }

        if max_fd < 0 {
            if timeout_ms < 0 {
                warn!("select: no entry has a watchable flag, waiting for a signal");
            } else {
                debug!("select: no entry has a watchable flag, sleeping {}ms", timeout_ms);
            }
        }

        let mut tv = to_timeval(timeout_ms);
        let tv_ptr = tv.as_mut().map_or(ptr::null_mut(), |tv| tv as *mut libc::timeval);

        // SAFETY: every pointer is either null or points at a set/timeval
        // that outlives the call.
        let n = unsafe {
            libc::select(
                max_fd + 1,
                read.as_mut_ptr(),
                write.as_mut_ptr(),
                except.as_mut_ptr(),
                tv_ptr,
            )
        };
        if n < 0 {
            return Err(Error::from_wait(IoError::last_os_error()));
        }

        table.reset_revents();
        if n == 0 {
            return Ok(0);
        }

        // select counts set membership, poll counts descriptors: recount.
        let mut ready = 0;
        for pfd in table.entries_mut() {
            let mut revents = EventMask::empty();
            if pfd.events.contains(EventMask::IN) && read.contains(pfd.fd) {
                revents |= EventMask::IN;
            }
            if pfd.events.contains(EventMask::OUT) && write.contains(pfd.fd) {
                revents |= EventMask::OUT;
            }
            if pfd.events.contains(EventMask::ERR) && except.contains(pfd.fd) {
                revents |= EventMask::ERR;
            }
            if !revents.is_empty() {
                ready += 1;
            }
            pfd.revents = revents;
        }
        Ok(ready)
    }
}

use std::io::Error as IoError;

use libc::{c_int, nfds_t};

use super::backend::Backend;
use super::mask::EventMask;
use super::table::PollTable;
use crate::error::{Error, Result};

/// `poll(2)` backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn wait(&self, table: &mut PollTable, timeout_ms: c_int) -> Result<usize> {
        // Build the libc array from our own entries instead of transmuting the
        // table, so its layout stays independent of `struct pollfd`.
        let mut raw: Vec<libc::pollfd> = table
            .entries()
            .iter()
            .map(|pfd| libc::pollfd { fd: pfd.fd, events: pfd.events.bits(), revents: 0 })
            .collect();

        // SAFETY: `raw` is a live, exclusively borrowed array of `raw.len()`
        // pollfd structs for the whole call.
        let n = unsafe { libc::poll(raw.as_mut_ptr(), raw.len() as nfds_t, timeout_ms) };
        if n < 0 {
            return Err(Error::from_wait(IoError::last_os_error()));
        }

        for (dst, src) in table.entries_mut().iter_mut().zip(raw.iter()) {
            dst.revents = EventMask::from_bits_retain(src.revents);
        }
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn pipe() -> (c_int, c_int) {
        let mut fds = [0 as c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn close(fd: c_int) {
        unsafe { libc::close(fd) };
    }

    #[test]
    fn pipe_write_end_is_writable() {
        let (r, w) = pipe();
        let mut table = PollTable::with_capacity(2);
        table.push(r, EventMask::IN);
        table.push(w, EventMask::OUT);

        let n = NativeBackend.wait(&mut table, 0).unwrap();
        assert_eq!(n, 1);
        assert!(table.entries()[0].revents.is_empty());
        assert!(table.entries()[1].revents.contains(EventMask::OUT));
        close(r);
        close(w);
    }

    #[test]
    fn timeout_returns_zero() {
        let (r, w) = pipe();
        let mut table = PollTable::with_capacity(1);
        table.push(r, EventMask::IN);

        let start = Instant::now();
        let n = NativeBackend.wait(&mut table, 30).unwrap();
        assert_eq!(n, 0);
        assert!(start.elapsed() >= Duration::from_millis(25));
        close(r);
        close(w);
    }
}

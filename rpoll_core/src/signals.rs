#![cfg(unix)]
//! Signal handlers that cut a blocked poll short.
//!
//! Handlers are installed without `SA_RESTART`, so a wait in progress returns
//! `PollInterrupted` and the caller decides whether to poll again.
use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use libc::c_int;

/// errno of the first install attempt, `None` when it succeeded.
static INIT: OnceLock<Option<i32>> = OnceLock::new();
static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_term(_sig: c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

extern "C" fn handle_wakeup(_sig: c_int) {}

fn install(sig: c_int, handler: extern "C" fn(c_int)) -> io::Result<()> {
    // SAFETY: the action is fully initialised before use and both handlers
    // only touch an atomic.
    let res = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(sig, &action, ptr::null_mut())
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Install SIGINT/SIGTERM handlers. Only the first call installs; every
/// later call reports that first outcome again.
pub fn init_term_signals() -> io::Result<()> {
    once(&INIT, || install(libc::SIGINT, handle_term).and_then(|_| install(libc::SIGTERM, handle_term)))
}

fn once(cell: &OnceLock<Option<i32>>, f: impl FnOnce() -> io::Result<()>) -> io::Result<()> {
    let errno = cell.get_or_init(|| f().err().map(|e| e.raw_os_error().unwrap_or(libc::EINVAL)));
    match errno {
        Some(code) => Err(io::Error::from_raw_os_error(*code)),
        None => Ok(()),
    }
}

/// Returns true if termination signal received.
pub fn should_terminate() -> bool {
    TERMINATE.load(Ordering::SeqCst)
}

/// Install a handler for `sig` that does nothing except interrupt whatever
/// system call the receiving thread is blocked in.
pub fn install_wakeup(sig: c_int) -> io::Result<()> {
    install(sig, handle_wakeup)
}

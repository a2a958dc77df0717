//! Single-shot readiness check over a watch list.

use std::fmt;

use libc::c_int;

use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::logger::{log_tracer, Tracer};
use crate::os::{build, collect, Backend, BackendKind, FdResolver, Resolver, ResultSet, UnsupportedBackend, WatchEntry};

/// A configured poller: one backend, chosen at construction, plus an optional
/// tracer. Holds no per-call state, so one instance can serve any number of
/// threads; every call builds and drops its own table.
pub struct Poll {
    backend: Box<dyn Backend>,
    tracer: Option<Tracer>,
}

impl Poll {
    /// Poller over the best backend for this target. On targets without one
    /// every call fails with `NotImplemented`.
    pub fn new() -> Self {
        let backend = BackendKind::detect()
            .and_then(|kind| kind.instantiate().ok())
            .unwrap_or_else(|| Box::new(UnsupportedBackend) as Box<dyn Backend>);
        Poll { backend, tracer: None }
    }

    /// Poller over a specific backend.
    pub fn with_backend(kind: BackendKind) -> Result<Self> {
        Ok(Poll { backend: kind.instantiate()?, tracer: None })
    }

    /// Poller over a caller-supplied backend implementation.
    pub fn from_backend(backend: Box<dyn Backend>) -> Self {
        Poll { backend, tracer: None }
    }

    pub fn from_config(cfg: &PollConfig) -> Result<Self> {
        let mut poll = match cfg.backend {
            Some(kind) => Poll::with_backend(kind)?,
            None => Poll::new(),
        };
        if cfg.trace {
            poll.tracer = Some(log_tracer());
        }
        Ok(poll)
    }

    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Wait for any entry of `watch` to become ready.
    ///
    /// `timeout_ms < 0` blocks until something is ready, `0` samples current
    /// state, positive values bound the wait. Handles without activity are
    /// absent from the result. An interrupted wait is reported as
    /// `PollInterrupted` and never restarted here.
    pub fn poll<'a, H>(&self, watch: &'a [WatchEntry<H>], timeout_ms: i64) -> Result<ResultSet<'a, H>>
    where
        FdResolver: Resolver<H>,
    {
        self.poll_with(&FdResolver, watch, timeout_ms)
    }

    /// Like [`Poll::poll`], resolving handles through `resolver`.
    pub fn poll_with<'a, H, R>(
        &self,
        resolver: &R,
        watch: &'a [WatchEntry<H>],
        timeout_ms: i64,
    ) -> Result<ResultSet<'a, H>>
    where
        R: Resolver<H> + ?Sized,
    {
        let timeout = c_int::try_from(timeout_ms)
            .map_err(|_| Error::InvalidArgument(format!("timeout {}ms does not fit a C int", timeout_ms)))?;
        self.trace(format_args!("got {} handles for polling, timeout = {}", watch.len(), timeout));

        let mut table = build(resolver, watch)?;
        for (i, pfd) in table.entries().iter().enumerate() {
            self.trace(format_args!("set mask for #{} (fd{}) to {:#x}", i, pfd.fd, pfd.events.to_raw()));
        }

        // An empty table would turn into a plain sleep (or hang for timeout < 0).
        if table.is_empty() {
            return Ok(ResultSet::empty());
        }

        let n = match self.backend.wait(&mut table, timeout) {
            Ok(n) => n,
            Err(e) => {
                self.trace(format_args!("{} wait failed: {}", self.backend.name(), e));
                return Err(e);
            }
        };
        self.trace(format_args!("{} poll got {} events", self.backend.name(), n));

        let result = collect(watch, &table);
        for (i, pfd) in table.entries().iter().enumerate().filter(|(_, p)| !p.revents.is_empty()) {
            self.trace(format_args!(
                "got events {:#x} for #{} (fd{}) with mask {:#x}",
                pfd.revents.to_raw(),
                i,
                pfd.fd,
                pfd.events.to_raw()
            ));
        }
        Ok(result)
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        if let Some(tracer) = &self.tracer {
            tracer(args);
        }
    }
}

impl Default for Poll {
    fn default() -> Self {
        Poll::new()
    }
}

impl fmt::Debug for Poll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poll")
            .field("backend", &self.backend.name())
            .field("traced", &self.tracer.is_some())
            .finish()
    }
}

/// One-off poll with the default backend and no tracing.
pub fn poll<'a, H>(watch: &'a [WatchEntry<H>], timeout_ms: i64) -> Result<ResultSet<'a, H>>
where
    FdResolver: Resolver<H>,
{
    Poll::new().poll(watch, timeout_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{Descriptor, EventMask, PollTable};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Marks every entry ready for exactly what it asked for.
    struct EchoBackend {
        calls: Arc<AtomicUsize>,
    }

    impl Backend for EchoBackend {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn wait(&self, table: &mut PollTable, _timeout_ms: c_int) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for pfd in table.entries_mut() {
                pfd.revents = pfd.events;
            }
            Ok(table.entries().iter().filter(|p| !p.revents.is_empty()).count())
        }
    }

    fn echo() -> (Poll, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Poll::from_backend(Box::new(EchoBackend { calls: calls.clone() })), calls)
    }

    fn open_fd(_: &&str) -> Option<crate::os::RawFd> {
        Some(0)
    }

    /// Spreads names over the standard descriptors so each is its own key.
    fn std_fd(name: &&str) -> Option<crate::os::RawFd> {
        match *name {
            "a" => Some(0),
            "b" => Some(1),
            _ => Some(2),
        }
    }

    #[test]
    fn empty_watch_list_skips_backend() {
        let (poll, calls) = echo();
        let watch: Vec<WatchEntry<Descriptor>> = Vec::new();
        let res = poll.poll_with(&|d: &Descriptor| Some(d.raw()), &watch, -1).unwrap();
        assert!(res.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn oversized_timeout_is_invalid_argument() {
        let (poll, calls) = echo();
        let watch = vec![WatchEntry::new("stdin", EventMask::IN)];
        let err = poll.poll_with(&open_fd, &watch, i64::from(c_int::MAX) + 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unresolvable_handle_fails_before_wait() {
        let (poll, calls) = echo();
        let watch = vec![WatchEntry::new("stdin", EventMask::IN), WatchEntry::new("gone", EventMask::IN)];
        let resolver = |h: &&str| if *h == "gone" { None } else { Some(0) };
        let err = poll.poll_with(&resolver, &watch, -1).unwrap_err();
        assert!(matches!(err, Error::InvalidHandle { position: 1, fd: None }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn results_map_back_to_handles() {
        let (poll, calls) = echo();
        let watch = vec![
            WatchEntry::new("a", EventMask::IN),
            WatchEntry::new("idle", EventMask::empty()),
            WatchEntry::new("b", EventMask::OUT | EventMask::PRI),
        ];
        let res = poll.poll_with(&std_fd, &watch, 0).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(res.len(), 2);
        assert_eq!(res.get(&"a"), Some(EventMask::IN));
        assert_eq!(res.get(&"b"), Some(EventMask::OUT | EventMask::PRI));
        assert!(!res.contains(&"idle"));
    }

    #[test]
    fn handle_listed_twice_is_reported_once() {
        let (poll, _) = echo();
        let watch = vec![WatchEntry::new("a", EventMask::IN), WatchEntry::new("a", EventMask::OUT)];
        let res = poll.poll_with(&std_fd, &watch, 0).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res.get(&"a"), Some(EventMask::OUT));
    }

    #[test]
    fn tracer_sees_each_step() {
        let (poll, _) = echo();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let poll = poll.with_tracer(Arc::new(move |args: fmt::Arguments<'_>| {
            sink.lock().unwrap().push(args.to_string());
        }));
        let watch = vec![WatchEntry::new("a", EventMask::IN)];
        poll.poll_with(&open_fd, &watch, 0).unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "got 1 handles for polling, timeout = 0");
        assert_eq!(lines[1], "set mask for #0 (fd0) to 0x1");
        assert_eq!(lines[2], "echo poll got 1 events");
        assert_eq!(lines[3], "got events 0x1 for #0 (fd0) with mask 0x1");
    }

    #[test]
    fn config_selects_backend() {
        let cfg: PollConfig = "backend=emulated\ntrace=on".parse().unwrap();
        match Poll::from_config(&cfg) {
            Ok(poll) => {
                assert_eq!(poll.backend_name(), "emulated");
                assert!(format!("{:?}", poll).contains("traced: true"));
            }
            Err(Error::NotImplemented) => assert!(!cfg!(unix)),
            Err(e) => panic!("unexpected: {}", e),
        }
    }
}

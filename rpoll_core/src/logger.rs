use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

/// Upper bound, in bytes, of a single trace line.
pub const MAX_TRACE_LEN: usize = 512;

/// Log target used for poll traces.
pub const TRACE_TARGET: &str = "rpoll";

/// Diagnostic sink a `Poll` reports its steps to.
pub type Tracer = Arc<dyn Fn(fmt::Arguments<'_>) + Send + Sync>;

/// Tracer that forwards to the `log` facade at debug level.
pub fn log_tracer() -> Tracer {
    Arc::new(|args: fmt::Arguments<'_>| {
        if log::log_enabled!(target: TRACE_TARGET, log::Level::Debug) {
            let line = format_bounded(args, MAX_TRACE_LEN);
            log::debug!(target: TRACE_TARGET, "{}", line);
        }
    })
}

/// Format `args`, keeping at most `max` bytes. Truncation happens on a char
/// boundary and is marked with a trailing `...`.
pub fn format_bounded(args: fmt::Arguments<'_>, max: usize) -> String {
    let mut w = BoundedWriter { buf: String::new(), max, truncated: false };
    // BoundedWriter never fails; an Err only comes from a Display impl.
    let _ = w.write_fmt(args);
    if w.truncated {
        w.buf.push_str("...");
    }
    w.buf
}

struct BoundedWriter {
    buf: String,
    max: usize,
    truncated: bool,
}

impl fmt::Write for BoundedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        let room = self.max - self.buf.len();
        if s.len() <= room {
            self.buf.push_str(s);
            return Ok(());
        }
        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.push_str(&s[..cut]);
        self.truncated = true;
        Ok(())
    }
}

/// stderr logger: `[unix-millis] [LEVEL] ThreadId: message`.
pub struct StderrLogger {
    // serialises writes so lines from several threads do not interleave
    lock: Mutex<()>,
}

static LOGGER: StderrLogger = StderrLogger { lock: Mutex::new(()) };

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let millis = ts.as_secs() * 1000 + ts.subsec_millis() as u64;
        let tid = std::thread::current().id();
        let _ = writeln!(io::stderr(), "[{}] [{}] {:?}: {}", millis, record.level(), tid, record.args());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Install the stderr logger. Safe to call more than once; later calls only
/// adjust the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// `off`, `error`, `warn`, `info`, `debug`, `trace`.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

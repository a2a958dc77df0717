//! Event mask shared by interest and result sides of a poll.

use std::fmt;
use std::str::FromStr;

use libc::c_short;

#[cfg(unix)]
mod sys {
    pub use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, POLLPRI};

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    pub use libc::{POLLRDBAND, POLLRDNORM, POLLWRBAND, POLLWRNORM};
}

#[cfg(not(unix))]
mod sys {
    use libc::c_short;

    pub const POLLIN: c_short = 0x0001;
    pub const POLLPRI: c_short = 0x0002;
    pub const POLLOUT: c_short = 0x0004;
    pub const POLLERR: c_short = 0x0008;
    pub const POLLHUP: c_short = 0x0010;
    pub const POLLNVAL: c_short = 0x0020;
}

bitflags::bitflags! {
    /// `struct pollfd` event bits.
    ///
    /// Values come from the platform headers via `libc`. Bits the kernel
    /// reports that have no name here are kept as-is.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct EventMask: c_short {
        const IN = sys::POLLIN;
        const PRI = sys::POLLPRI;
        const OUT = sys::POLLOUT;
        const ERR = sys::POLLERR;
        const HUP = sys::POLLHUP;
        const NVAL = sys::POLLNVAL;

        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        const RDNORM = sys::POLLRDNORM;
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        const RDBAND = sys::POLLRDBAND;
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        const WRNORM = sys::POLLWRNORM;
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        ))]
        const WRBAND = sys::POLLWRBAND;
    }
}

impl EventMask {
    /// Flags the `select(2)` emulation can request and report.
    pub const SELECTABLE: EventMask = EventMask::IN.union(EventMask::OUT).union(EventMask::ERR);

    /// Mask from an untyped integer, as handed over by a front-end.
    ///
    /// Accepts `0..=0xFFFF`; the value is reinterpreted as the native
    /// `short` without dropping unnamed bits.
    pub fn from_raw(raw: i64) -> Option<EventMask> {
        if !(0..=0xFFFF).contains(&raw) {
            return None;
        }
        Some(EventMask::from_bits_retain(raw as u16 as c_short))
    }

    /// Mask as the unsigned integer handed back to a front-end.
    pub fn to_raw(self) -> u16 {
        self.bits() as u16
    }
}

/// Parses `in,out,pri`-style lists (case-insensitive, `|` also accepted) or a
/// plain decimal/`0x` hex number.
impl FromStr for EventMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let v = i64::from_str_radix(hex, 16).map_err(|_| format!("bad mask: {}", s))?;
            return EventMask::from_raw(v).ok_or_else(|| format!("mask out of range: {}", s));
        }
        if let Ok(v) = s.parse::<i64>() {
            return EventMask::from_raw(v).ok_or_else(|| format!("mask out of range: {}", s));
        }
        let mut mask = EventMask::empty();
        for name in s.split(|c| c == ',' || c == '|') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let upper = name.to_ascii_uppercase();
            let upper = upper.strip_prefix("POLL").unwrap_or(&upper);
            match EventMask::from_name(upper) {
                Some(flag) => mask |= flag,
                None => return Err(format!("unknown event flag: {}", name)),
            }
        }
        Ok(mask)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        let unnamed = self.bits() & !EventMask::all().bits();
        if unnamed != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{:#x}", unnamed as u16)?;
        }
        Ok(())
    }
}

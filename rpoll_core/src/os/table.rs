//! Watch list → poll table, and poll table → result set.

use super::mask::EventMask;
use super::resolve::{is_open, Resolver};
use super::RawFd;
use crate::error::{Error, Result};

/// One (handle, interest) pair of a watch list.
#[derive(Clone, Debug)]
pub struct WatchEntry<H> {
    pub handle: H,
    pub interest: EventMask,
}

impl<H> WatchEntry<H> {
    pub fn new(handle: H, interest: EventMask) -> Self {
        WatchEntry { handle, interest }
    }

    /// Entry from an untyped integer mask; rejects negative or over-wide values.
    pub fn from_raw(handle: H, interest: i64) -> Result<Self> {
        let interest = EventMask::from_raw(interest).ok_or_else(|| {
            Error::InvalidArgument(format!("event mask {} is not a 16-bit non-negative integer", interest))
        })?;
        Ok(WatchEntry { handle, interest })
    }
}

/// Native counterpart of one watch entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollFd {
    pub fd: RawFd,
    pub events: EventMask,
    pub revents: EventMask,
}

/// Order-preserving table of descriptors for a single wait.
#[derive(Debug, Default)]
pub struct PollTable {
    fds: Vec<PollFd>,
}

impl PollTable {
    pub fn with_capacity(n: usize) -> Self {
        PollTable { fds: Vec::with_capacity(n) }
    }

    pub fn push(&mut self, fd: RawFd, events: EventMask) {
        self.fds.push(PollFd { fd, events, revents: EventMask::empty() });
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    pub fn entries(&self) -> &[PollFd] {
        &self.fds
    }

    pub fn entries_mut(&mut self) -> &mut [PollFd] {
        &mut self.fds
    }

    /// Clears every `revents` before a wait refills them.
    #[cfg_attr(not(unix), allow(dead_code))]
    pub(crate) fn reset_revents(&mut self) {
        for pfd in &mut self.fds {
            pfd.revents = EventMask::empty();
        }
    }
}

/// Resolve every handle and lay the table out in watch-list order.
///
/// Nothing is reordered, merged or skipped: position `i` of the table always
/// belongs to position `i` of `watch`.
pub fn build<H, R>(resolver: &R, watch: &[WatchEntry<H>]) -> Result<PollTable>
where
    R: Resolver<H> + ?Sized,
{
    let mut table = PollTable::with_capacity(watch.len());
    for (position, entry) in watch.iter().enumerate() {
        let fd = resolver.resolve(&entry.handle);
        match fd {
            Some(fd) if is_open(fd) => table.push(fd, entry.interest),
            _ => return Err(Error::InvalidHandle { position, fd }),
        }
    }
    Ok(table)
}

/// Pair every entry with activity back up with its handle.
///
/// The result is keyed by descriptor: when several ready positions share one,
/// the last of them replaces the earlier ones.
pub fn collect<'a, H>(watch: &'a [WatchEntry<H>], table: &PollTable) -> ResultSet<'a, H> {
    debug_assert_eq!(watch.len(), table.len());
    let mut ready: Vec<Ready<'a, H>> = Vec::new();
    for (position, (entry, pfd)) in watch.iter().zip(table.entries()).enumerate() {
        if pfd.revents.is_empty() {
            continue;
        }
        ready.retain(|r| r.fd != pfd.fd);
        ready.push(Ready { position, fd: pfd.fd, handle: &entry.handle, events: pfd.revents });
    }
    ResultSet { ready }
}

#[derive(Debug)]
struct Ready<'a, H> {
    position: usize,
    fd: RawFd,
    handle: &'a H,
    events: EventMask,
}

/// Handles that saw activity, with the events observed on each.
///
/// Handles are borrowed from the watch list the call was made with. A handle
/// absent from the set had no activity. Each descriptor appears at most once.
#[derive(Debug)]
pub struct ResultSet<'a, H> {
    ready: Vec<Ready<'a, H>>,
}

impl<'a, H> ResultSet<'a, H> {
    pub(crate) fn empty() -> Self {
        ResultSet { ready: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Events for the watch-list entry at `position`, if it was ready and no
    /// later entry for the same descriptor replaced it.
    pub fn get_index(&self, position: usize) -> Option<EventMask> {
        self.ready.iter().find(|r| r.position == position).map(|r| r.events)
    }

    /// `(handle, events)` pairs, ordered by the position that supplied them.
    pub fn iter(&self) -> impl Iterator<Item = (&'a H, EventMask)> + '_ {
        self.ready.iter().map(|r| (r.handle, r.events))
    }

    /// Watch-list positions that were ready.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.ready.iter().map(|r| r.position)
    }

    /// Handles with any of `mask` set in their observed events.
    pub fn matching(&self, mask: EventMask) -> impl Iterator<Item = &'a H> + '_ {
        self.ready.iter().filter(move |r| r.events.intersects(mask)).map(|r| r.handle)
    }
}

impl<'a, H: PartialEq> ResultSet<'a, H> {
    pub fn get(&self, handle: &H) -> Option<EventMask> {
        self.ready.iter().find(|r| r.handle == handle).map(|r| r.events)
    }

    pub fn contains(&self, handle: &H) -> bool {
        self.get(handle).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::Descriptor;

    fn fixed(fd: &Descriptor) -> Option<RawFd> {
        Some(fd.raw())
    }

    #[cfg(unix)]
    #[test]
    fn build_keeps_order_and_copies_interest() {
        // stdin/stdout/stderr are open in the test harness
        let watch = vec![
            WatchEntry::new(Descriptor::from_raw(2), EventMask::OUT),
            WatchEntry::new(Descriptor::from_raw(0), EventMask::IN | EventMask::PRI),
            WatchEntry::new(Descriptor::from_raw(2), EventMask::ERR),
        ];
        let table = build(&fixed, &watch).unwrap();
        let fds: Vec<_> = table.entries().iter().map(|p| (p.fd, p.events)).collect();
        assert_eq!(
            fds,
            vec![(2, EventMask::OUT), (0, EventMask::IN | EventMask::PRI), (2, EventMask::ERR)]
        );
        assert!(table.entries().iter().all(|p| p.revents.is_empty()));
    }

    #[test]
    fn build_empty() {
        let watch: Vec<WatchEntry<Descriptor>> = Vec::new();
        let table = build(&fixed, &watch).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn build_rejects_unresolvable() {
        let watch = vec![
            WatchEntry::new(Descriptor::from_raw(0), EventMask::IN),
            WatchEntry::new(Descriptor::from_raw(-1), EventMask::IN),
        ];
        match build(&fixed, &watch) {
            Err(Error::InvalidHandle { position: 1, fd: Some(-1) }) => {}
            other => panic!("unexpected: {:?}", other),
        }
        let none = |_: &Descriptor| -> Option<RawFd> { None };
        match build(&none, &watch) {
            Err(Error::InvalidHandle { position: 0, fd: None }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn collect_skips_idle_entries() {
        let watch = vec![
            WatchEntry::new("a", EventMask::IN),
            WatchEntry::new("b", EventMask::OUT),
            WatchEntry::new("c", EventMask::IN | EventMask::OUT),
        ];
        let mut table = PollTable::with_capacity(3);
        for (i, e) in watch.iter().enumerate() {
            table.push(i as RawFd + 10, e.interest);
        }
        table.entries_mut()[1].revents = EventMask::OUT;
        table.entries_mut()[2].revents = EventMask::HUP | EventMask::IN;

        let res = collect(&watch, &table);
        assert_eq!(res.len(), 2);
        assert_eq!(res.get(&"a"), None);
        assert_eq!(res.get(&"b"), Some(EventMask::OUT));
        assert_eq!(res.get_index(2), Some(EventMask::HUP | EventMask::IN));
        assert_eq!(res.positions().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(res.matching(EventMask::HUP).copied().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn repeated_descriptor_is_one_key_and_last_wins() {
        let watch = vec![
            WatchEntry::new("b", EventMask::IN),
            WatchEntry::new("c", EventMask::OUT),
            WatchEntry::new("b", EventMask::OUT),
            WatchEntry::new("b", EventMask::PRI),
        ];
        let mut table = PollTable::with_capacity(4);
        for (fd, e) in [7, 8, 7, 7].into_iter().zip(&watch) {
            table.push(fd, e.interest);
        }
        table.entries_mut()[0].revents = EventMask::IN;
        table.entries_mut()[1].revents = EventMask::OUT;
        table.entries_mut()[2].revents = EventMask::OUT;

        let res = collect(&watch, &table);
        assert_eq!(res.len(), 2);
        assert_eq!(res.get(&"b"), Some(EventMask::OUT));
        assert_eq!(res.get_index(0), None);
        assert_eq!(res.get_index(2), Some(EventMask::OUT));
        assert_eq!(res.iter().map(|(h, _)| *h).collect::<Vec<_>>(), vec!["c", "b"]);
    }

    #[test]
    fn from_raw_rejects_negative_mask() {
        assert!(matches!(WatchEntry::from_raw(0, -4), Err(Error::InvalidArgument(_))));
        let e = WatchEntry::from_raw(0, 1).unwrap();
        assert_eq!(e.interest, EventMask::IN);
    }
}

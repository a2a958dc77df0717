//! Handle → raw descriptor resolution.

use super::RawFd;

#[cfg(unix)]
use std::os::unix::io::{AsFd, AsRawFd};

/// Maps a caller's handle to the descriptor the kernel should watch.
///
/// Returning `None` (or a negative descriptor) marks the handle as
/// unresolvable; table building then fails with `InvalidHandle`.
pub trait Resolver<H: ?Sized> {
    fn resolve(&self, handle: &H) -> Option<RawFd>;
}

impl<H: ?Sized, F> Resolver<H> for F
where
    F: Fn(&H) -> Option<RawFd>,
{
    fn resolve(&self, handle: &H) -> Option<RawFd> {
        self(handle)
    }
}

/// Resolves anything that lends out its descriptor through `AsFd`
/// (streams, files, and references to them) plus bare [`Descriptor`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct FdResolver;

#[cfg(unix)]
impl<H: AsFd + ?Sized> Resolver<H> for FdResolver {
    fn resolve(&self, handle: &H) -> Option<RawFd> {
        Some(handle.as_fd().as_raw_fd())
    }
}

impl Resolver<Descriptor> for FdResolver {
    fn resolve(&self, handle: &Descriptor) -> Option<RawFd> {
        Some(handle.raw())
    }
}

/// A bare descriptor number. Does not own the descriptor and never closes it,
/// so it may name a closed one; that is caught when the table is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor(RawFd);

impl Descriptor {
    pub const fn from_raw(fd: RawFd) -> Self {
        Descriptor(fd)
    }

    pub const fn raw(self) -> RawFd {
        self.0
    }
}

#[cfg(unix)]
impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

/// Whether `fd` names a descriptor open in this process.
#[cfg(unix)]
pub(crate) fn is_open(fd: RawFd) -> bool {
    if fd < 0 {
        return false;
    }
    // SAFETY: F_GETFD only inspects the descriptor table.
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}

#[cfg(not(unix))]
pub(crate) fn is_open(fd: RawFd) -> bool {
    fd >= 0
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;

    fn resolve_with<H: ?Sized>(handle: &H) -> Option<RawFd>
    where
        FdResolver: Resolver<H>,
    {
        FdResolver.resolve(handle)
    }

    #[test]
    fn streams_and_borrowed_streams_resolve() {
        let (a, _b) = UnixStream::pair().unwrap();
        let fd = a.as_raw_fd();
        assert_eq!(resolve_with(&a), Some(fd));
        assert_eq!(resolve_with(&&a), Some(fd));
        assert!(is_open(fd));
    }

    #[test]
    fn bare_descriptors_resolve_as_given() {
        assert_eq!(resolve_with(&Descriptor::from_raw(-1)), Some(-1));
        assert!(!is_open(-1));
    }
}

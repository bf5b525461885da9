use crate::mask::Mask;
use libc::{c_int, c_short, pollfd};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::io::{Error, ErrorKind};
use std::os::fd::RawFd;
use std::time::Duration;

const READ_EVENTS: c_short = libc::POLLIN | libc::POLLHUP | libc::POLLERR;

const WRITE_EVENTS: c_short = libc::POLLOUT | libc::POLLERR;

const EXCEPTION_EVENTS: c_short = libc::POLLPRI;

impl Mask {
    /// The `poll(2)` request bits for this mask.
    #[must_use]
    pub fn to_poll_events(self) -> c_short {
        let mut events = 0;
        if self.contains(Mask::READABLE) {
            events |= libc::POLLIN;
        }
        if self.contains(Mask::WRITABLE) {
            events |= libc::POLLOUT;
        }
        if self.contains(Mask::EXCEPTION) {
            events |= libc::POLLPRI;
        }
        events
    }

    /// Classifies `poll(2)` result bits, keeping only the `requested` categories.
    ///
    /// Errors and hang-ups are reported the way `select(2)` does: as readable,
    /// and errors also as writable, so the callback finds out on its next I/O call.
    /// `POLLNVAL` maps to nothing, a descriptor that is not open fails the wait instead.
    #[must_use]
    pub fn from_poll_revents(revents: c_short, requested: Mask) -> Mask {
        let mut mask = Mask::NONE;
        if revents & READ_EVENTS != 0 {
            mask |= Mask::READABLE;
        }
        if revents & WRITE_EVENTS != 0 {
            mask |= Mask::WRITABLE;
        }
        if revents & EXCEPTION_EVENTS != 0 {
            mask |= Mask::EXCEPTION;
        }
        mask & requested
    }
}

/// Descriptors to watch, one set per category.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Interests {
    readable: BTreeSet<RawFd>,
    writable: BTreeSet<RawFd>,
    exceptional: BTreeSet<RawFd>,
}

impl Interests {
    /// Watch `fd` for every category in `mask`.
    pub fn add(&mut self, fd: RawFd, mask: Mask) {
        if mask.contains(Mask::READABLE) {
            _ = self.readable.insert(fd);
        }
        if mask.contains(Mask::WRITABLE) {
            _ = self.writable.insert(fd);
        }
        if mask.contains(Mask::EXCEPTION) {
            _ = self.exceptional.insert(fd);
        }
    }

    /// Descriptors watched for reading.
    #[must_use]
    pub fn readable(&self) -> &BTreeSet<RawFd> {
        &self.readable
    }

    /// Descriptors watched for writing.
    #[must_use]
    pub fn writable(&self) -> &BTreeSet<RawFd> {
        &self.writable
    }

    /// Descriptors watched for exceptional conditions.
    #[must_use]
    pub fn exceptional(&self) -> &BTreeSet<RawFd> {
        &self.exceptional
    }

    /// Everything `fd` is watched for.
    #[must_use]
    pub fn mask_of(&self, fd: RawFd) -> Mask {
        let mut mask = Mask::NONE;
        if self.readable.contains(&fd) {
            mask |= Mask::READABLE;
        }
        if self.writable.contains(&fd) {
            mask |= Mask::WRITABLE;
        }
        if self.exceptional.contains(&fd) {
            mask |= Mask::EXCEPTION;
        }
        mask
    }

    /// The merged mask of each watched descriptor, ordered by descriptor.
    #[must_use]
    pub fn masks(&self) -> BTreeMap<RawFd, Mask> {
        let mut masks = BTreeMap::new();
        for (set, flag) in [
            (&self.readable, Mask::READABLE),
            (&self.writable, Mask::WRITABLE),
            (&self.exceptional, Mask::EXCEPTION),
        ] {
            for fd in set {
                *masks.entry(*fd).or_insert(Mask::NONE) |= flag;
            }
        }
        masks
    }

    /// Returns `true` if no descriptor is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readable.is_empty() && self.writable.is_empty() && self.exceptional.is_empty()
    }

    /// The number of distinct descriptors watched.
    #[must_use]
    pub fn len(&self) -> usize {
        self.masks().len()
    }
}

/// A descriptor that fired, with the categories it fired for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Ready {
    /// The descriptor.
    pub fd: RawFd,
    /// The fired categories, never empty.
    pub mask: Mask,
}

/// Event driven abstraction.
pub trait Selector: Debug {
    /// Wait for any of `interests` to become ready.
    ///
    /// `timeout` is `Some(Duration::ZERO)` to poll without blocking, `Some(dur)` to block
    /// for at most `dur` and `None` to block until something is ready.
    /// Only descriptors with a non-empty fired mask are returned.
    ///
    /// # Errors
    /// if the wait failed or was interrupted.
    fn select(
        &mut self,
        interests: &Interests,
        timeout: Option<Duration>,
    ) -> std::io::Result<Vec<Ready>>;
}

/// A [`Selector`] over `poll(2)`.
///
/// The request is rebuilt on every call, so nothing is registered with the kernel
/// between calls.
#[derive(Default)]
pub struct PollSelector {
    fds: Vec<pollfd>,
}

impl PollSelector {
    /// Creates a new `PollSelector`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Debug for PollSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSelector")
            .field("capacity", &self.fds.capacity())
            .finish()
    }
}

impl Selector for PollSelector {
    fn select(
        &mut self,
        interests: &Interests,
        timeout: Option<Duration>,
    ) -> std::io::Result<Vec<Ready>> {
        self.fds.clear();
        for (fd, mask) in interests.masks() {
            self.fds.push(pollfd {
                fd,
                events: mask.to_poll_events(),
                revents: 0,
            });
        }
        let count = sys_poll(&mut self.fds, poll_timeout(timeout))?;
        check_open(&self.fds)?;
        let mut ready = Vec::with_capacity(count);
        if count == 0 {
            return Ok(ready);
        }
        for fd in &self.fds {
            if fd.revents == 0 {
                continue;
            }
            let requested = interests.mask_of(fd.fd);
            let mask = Mask::from_poll_revents(fd.revents, requested);
            if !mask.is_empty() {
                ready.push(Ready { fd: fd.fd, mask });
            }
        }
        Ok(ready)
    }
}

fn poll_timeout(timeout: Option<Duration>) -> c_int {
    timeout.map_or(-1, |dur| {
        // partial milliseconds round up
        let millis = dur.as_millis() + u128::from(dur.subsec_nanos() % 1_000_000 != 0);
        c_int::try_from(millis).unwrap_or(c_int::MAX)
    })
}

fn sys_poll(fds: &mut [pollfd], timeout: c_int) -> std::io::Result<usize> {
    let nfds = libc::nfds_t::try_from(fds.len())
        .map_err(|_| Error::new(ErrorKind::InvalidInput, "too many descriptors"))?;
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), nfds, timeout) };
    if rc < 0 {
        return Err(Error::last_os_error());
    }
    Ok(usize::try_from(rc).unwrap_or(0))
}

/// Fails with `EBADF` if any descriptor is not open, as `select(2)` does.
fn check_open(fds: &[pollfd]) -> std::io::Result<()> {
    if fds.iter().any(|fd| fd.revents & libc::POLLNVAL != 0) {
        return Err(Error::from_raw_os_error(libc::EBADF));
    }
    Ok(())
}

/// Wait up to `milliseconds` for `fd` to become ready for any category in `mask`.
///
/// Independent of any event loop. Returns the fired categories among `mask`. The result
/// is empty when `poll(2)` only reported conditions outside `mask`, such as a hang-up
/// while waiting for writability alone.
///
/// # Errors
/// `ErrorKind::TimedOut` if nothing fired in time, `EBADF` if `fd` is not open, or the
/// `poll(2)` error.
pub fn wait_one(fd: RawFd, mask: Mask, milliseconds: u64) -> std::io::Result<Mask> {
    let mut fds = [pollfd {
        fd,
        events: mask.to_poll_events(),
        revents: 0,
    }];
    let timeout = c_int::try_from(milliseconds).unwrap_or(c_int::MAX);
    if sys_poll(&mut fds, timeout)? == 0 {
        return Err(Error::new(ErrorKind::TimedOut, "wait timeout"));
    }
    check_open(&fds)?;
    Ok(Mask::from_poll_revents(fds[0].revents, mask))
}

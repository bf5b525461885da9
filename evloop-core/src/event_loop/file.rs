use crate::event_loop::{EventLoop, FinalizerProc};
use evloop_net::mask::Mask;
use evloop_net::selector::{Interests, Ready};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::io::{Error, ErrorKind};
use std::os::fd::RawFd;

/// Callback of a file event, called with the loop, the descriptor and the categories
/// that fired among those it registered for.
pub type FileProc<'e> = Box<dyn FnMut(&mut EventLoop<'e>, RawFd, Mask) + 'e>;

/// Identifies one file event registration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FileHandle(u64);

pub(crate) struct FileEvent<'e> {
    handle: FileHandle,
    fd: RawFd,
    mask: Mask,
    // taken out while the callback runs
    proc: Option<FileProc<'e>>,
    finalizer: Option<FinalizerProc<'e>>,
}

impl Debug for FileEvent<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEvent")
            .field("handle", &self.handle)
            .field("fd", &self.fd)
            .field("mask", &self.mask)
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}

/// File events in registration order.
///
/// The same `(fd, mask)` may be registered more than once, removal by that pair then
/// takes the oldest registration.
#[derive(Debug)]
pub(crate) struct FileEvents<'e> {
    next_handle: u64,
    events: Vec<FileEvent<'e>>,
}

impl<'e> FileEvents<'e> {
    pub(crate) fn with_capacity(capacity: usize) -> std::io::Result<Self> {
        let mut events = Vec::new();
        events
            .try_reserve(capacity)
            .map_err(|e| Error::new(ErrorKind::OutOfMemory, e))?;
        Ok(FileEvents {
            next_handle: 0,
            events,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(
        &mut self,
        fd: RawFd,
        mask: Mask,
        proc: FileProc<'e>,
        finalizer: Option<FinalizerProc<'e>>,
    ) -> std::io::Result<FileHandle> {
        if fd < 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("invalid descriptor {fd}"),
            ));
        }
        if mask.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("empty mask for descriptor {fd}"),
            ));
        }
        self.events
            .try_reserve(1)
            .map_err(|e| Error::new(ErrorKind::OutOfMemory, e))?;
        let handle = FileHandle(self.next_handle);
        self.next_handle += 1;
        self.events.push(FileEvent {
            handle,
            fd,
            mask,
            proc: Some(proc),
            finalizer,
        });
        Ok(handle)
    }

    fn index_of(&self, handle: FileHandle) -> Option<usize> {
        self.events.binary_search_by(|x| x.handle.cmp(&handle)).ok()
    }

    fn remove(&mut self, fd: RawFd, mask: Mask) -> Option<FileEvent<'e>> {
        self.events
            .iter()
            .position(|event| event.fd == fd && event.mask == mask)
            .map(|index| self.events.remove(index))
    }

    fn remove_handle(&mut self, handle: FileHandle) -> Option<FileEvent<'e>> {
        self.index_of(handle).map(|index| self.events.remove(index))
    }

    pub(crate) fn interests(&self) -> Interests {
        let mut interests = Interests::default();
        for event in &self.events {
            interests.add(event.fd, event.mask);
        }
        interests
    }

    /// The oldest registration whose interest intersects what fired for its descriptor,
    /// with the intersection.
    fn next_fired(&self, fired: &HashMap<RawFd, Mask>) -> Option<(FileHandle, RawFd, Mask)> {
        self.events.iter().find_map(|event| {
            let mask = fired.get(&event.fd).map(|mask| *mask & event.mask)?;
            if mask.is_empty() || event.proc.is_none() {
                return None;
            }
            Some((event.handle, event.fd, mask))
        })
    }

    fn take_proc(&mut self, handle: FileHandle) -> Option<FileProc<'e>> {
        self.index_of(handle)
            .and_then(|index| self.events[index].proc.take())
    }

    fn restore_proc(&mut self, handle: FileHandle, proc: FileProc<'e>) -> bool {
        if let Some(index) = self.index_of(handle) {
            self.events[index].proc = Some(proc);
            return true;
        }
        false
    }
}

impl<'e> EventLoop<'e> {
    /// Call `proc` whenever `fd` is ready for any category in `mask`.
    ///
    /// Registrations are not deduplicated: registering the same `(fd, mask)` twice keeps
    /// both, and [`delete_file_event`](EventLoop::delete_file_event) removes the oldest.
    ///
    /// # Errors
    /// `ErrorKind::InvalidInput` if `fd` is negative or `mask` is empty,
    /// `ErrorKind::OutOfMemory` if the registry can not grow. Nothing is registered then.
    pub fn create_file_event(
        &mut self,
        fd: RawFd,
        mask: Mask,
        proc: impl FnMut(&mut EventLoop<'e>, RawFd, Mask) + 'e,
        finalizer: Option<FinalizerProc<'e>>,
    ) -> std::io::Result<FileHandle> {
        let handle = self
            .file_events
            .insert(fd, mask, Box::new(proc), finalizer)?;
        crate::debug!("{} add file event {handle:?} fd:{fd} mask:{mask}", self.name);
        Ok(handle)
    }

    /// Remove the oldest registration of exactly `(fd, mask)` and run its finalizer.
    ///
    /// Nothing happens if there is none.
    pub fn delete_file_event(&mut self, fd: RawFd, mask: Mask) {
        if let Some(event) = self.file_events.remove(fd, mask) {
            crate::debug!("{} del file event {:?}", self.name, event.handle);
            self.finalize(event.finalizer);
        }
    }

    /// Remove the registration `handle` and run its finalizer.
    ///
    /// Returns `false` if it was already removed.
    pub fn delete_file_event_by_handle(&mut self, handle: FileHandle) -> bool {
        if let Some(event) = self.file_events.remove_handle(handle) {
            crate::debug!("{} del file event {handle:?}", self.name);
            self.finalize(event.finalizer);
            return true;
        }
        false
    }

    /// Returns the number of registered file events.
    #[must_use]
    pub fn file_events_len(&self) -> usize {
        self.file_events.len()
    }

    /// Deliver `ready` to the registrations interested in it.
    ///
    /// Each descriptor is delivered at most once: once a callback ran for it, it is dropped
    /// from the fired set, so other registrations of that descriptor wait for the next pass.
    /// The next registration is looked up again after every callback, since callbacks may
    /// add or remove any registration.
    pub(super) fn process_file_events(&mut self, ready: Vec<Ready>) -> usize {
        let mut fired: HashMap<RawFd, Mask> = HashMap::with_capacity(ready.len());
        for Ready { fd, mask } in ready {
            *fired.entry(fd).or_insert(Mask::NONE) |= mask;
        }
        let mut processed = 0;
        while let Some((handle, fd, mask)) = self.file_events.next_fired(&fired) {
            _ = fired.remove(&fd);
            let Some(mut proc) = self.file_events.take_proc(handle) else {
                continue;
            };
            proc(self, fd, mask);
            processed += 1;
            if !self.file_events.restore_proc(handle, proc) {
                crate::debug!("{} file event {handle:?} removed by its callback", self.name);
            }
        }
        processed
    }
}

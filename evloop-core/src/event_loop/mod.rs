use crate::common::Named;
use crate::config::Config;
use crate::event_loop::file::FileEvents;
use crate::event_loop::time::TimeEvent;
use evloop_net::selector::{Interests, PollSelector, Selector};
use evloop_timer::{Deadline, TimerTable};
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Constants.
pub mod constants;

mod file;

mod time;


pub use constants::{EventKinds, TimerAction, WaitPolicy};
pub use file::{FileHandle, FileProc};
pub use time::TimeProc;

/// Cleanup run exactly once when its registration is removed.
pub type FinalizerProc<'e> = Box<dyn FnOnce(&mut EventLoop<'e>) + 'e>;

/// Boxes `f` as a [`FinalizerProc`].
pub fn finalizer<'e>(f: impl FnOnce(&mut EventLoop<'e>) + 'e) -> FinalizerProc<'e> {
    Box::new(f)
}

/// A single-threaded reactor over file readiness and timers.
///
/// Every callback gets the loop itself, so it can register and remove events, or
/// [`stop`](EventLoop::stop) the loop, while it is being dispatched.
///
/// Dropping the loop does not run the finalizers of events that are still registered,
/// remove them first if their cleanup matters.
pub struct EventLoop<'e> {
    name: String,
    stop: bool,
    file_events: FileEvents<'e>,
    time_events: TimerTable<TimeEvent<'e>>,
    selector: Box<dyn Selector + 'e>,
}

impl<'e> EventLoop<'e> {
    /// Create a new `EventLoop` polling with [`PollSelector`].
    ///
    /// # Errors
    /// if the registries can not be allocated.
    pub fn new(config: &Config) -> std::io::Result<Self> {
        Self::with_selector(config, PollSelector::new())
    }

    /// Create a new `EventLoop` waiting for readiness through `selector`.
    ///
    /// # Errors
    /// if the registries can not be allocated.
    pub fn with_selector(config: &Config, selector: impl Selector + 'e) -> std::io::Result<Self> {
        let event_loop = EventLoop {
            name: config.get_name().to_owned(),
            stop: false,
            file_events: FileEvents::with_capacity(config.get_file_capacity())?,
            time_events: TimerTable::with_capacity(config.get_time_capacity())?,
            selector: Box::new(selector),
        };
        crate::debug!("{} created with {config}", event_loop.name);
        Ok(event_loop)
    }

    /// Ask [`run`](EventLoop::run) to return once the current pass is over.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    /// Returns `true` if a stop was requested since the loop last started running.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop
    }

    /// Dispatch passes until [`stop`](EventLoop::stop) is called, usually from a callback.
    ///
    /// A stop requested before this call is forgotten.
    pub fn run(&mut self) {
        self.stop = false;
        crate::info!("{} running", self.name);
        while !self.stop {
            _ = self.process_events(EventKinds::ALL, WaitPolicy::Wait);
        }
        crate::info!("{} stopped", self.name);
    }

    /// Run one dispatch pass and return how many callbacks were invoked.
    ///
    /// File events are handled first, then timers. With [`WaitPolicy::Wait`] the pass
    /// blocks until a descriptor is ready or, when timers are included, the nearest timer
    /// is due. A failed wait is logged and yields no file event, timers still run.
    pub fn process_events(&mut self, kinds: EventKinds, policy: WaitPolicy) -> usize {
        let file = kinds.contains(EventKinds::FILE);
        let time = kinds.contains(EventKinds::TIME);
        if !file && !time {
            return 0;
        }
        let interests = if file {
            self.file_events.interests()
        } else {
            Interests::default()
        };
        let mut processed = 0;
        // select even without descriptors, to sleep until the nearest timer
        if !interests.is_empty() || (time && WaitPolicy::Wait == policy) {
            let timeout = self.select_timeout(time, policy);
            match self.selector.select(&interests, timeout) {
                Ok(ready) => {
                    if !ready.is_empty() {
                        processed += self.process_file_events(ready);
                    }
                }
                Err(e) => {
                    crate::warn!("{} select failed: {e}", self.name);
                }
            }
        }
        if time {
            processed += self.process_time_events();
        }
        processed
    }

    fn select_timeout(&self, time: bool, policy: WaitPolicy) -> Option<Duration> {
        if time && WaitPolicy::Wait == policy {
            if let Some(nearest) = self.time_events.nearest() {
                return Some(nearest.saturating_duration_since(Deadline::now()));
            }
        }
        match policy {
            WaitPolicy::DontWait => Some(Duration::ZERO),
            WaitPolicy::Wait => None,
        }
    }

    fn finalize(&mut self, finalizer: Option<FinalizerProc<'e>>) {
        if let Some(finalizer) = finalizer {
            finalizer(self);
        }
    }
}

impl Default for EventLoop<'_> {
    fn default() -> Self {
        Self::new(&Config::default()).expect("create event-loop failed")
    }
}

impl Named for EventLoop<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }
}

impl Debug for EventLoop<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("name", &self.name)
            .field("stop", &self.stop)
            .field("file_events", &self.file_events)
            .field("time_events", &self.time_events.len())
            .field("selector", &self.selector)
            .finish()
    }
}

impl Drop for EventLoop<'_> {
    fn drop(&mut self) {
        if !self.file_events.is_empty() || !self.time_events.is_empty() {
            crate::warn!(
                "{} dropped with {} file events and {} time events registered, their finalizers will not run",
                self.name,
                self.file_events.len(),
                self.time_events.len()
            );
        }
    }
}

use crate::event_loop::{EventLoop, FinalizerProc, TimerAction};
use evloop_timer::Deadline;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::io::{Error, ErrorKind};

/// Callback of a timer, called with the loop and the timer id.
pub type TimeProc<'e> = Box<dyn FnMut(&mut EventLoop<'e>, u64) -> TimerAction + 'e>;

pub(crate) struct TimeEvent<'e> {
    // taken out while the callback runs
    proc: Option<TimeProc<'e>>,
    finalizer: Option<FinalizerProc<'e>>,
}

impl Debug for TimeEvent<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeEvent")
            .field("running", &self.proc.is_none())
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}

impl<'e> EventLoop<'e> {
    /// Call `proc` once `milliseconds` have elapsed, returns the timer id.
    ///
    /// Ids grow strictly and are never reused. What `proc` returns decides whether the
    /// timer fires again or is deleted, see [`TimerAction`].
    ///
    /// # Errors
    /// `ErrorKind::OutOfMemory` if the registry can not grow. Nothing is registered then
    /// and no id is consumed.
    pub fn create_time_event(
        &mut self,
        milliseconds: u64,
        proc: impl FnMut(&mut EventLoop<'e>, u64) -> TimerAction + 'e,
        finalizer: Option<FinalizerProc<'e>>,
    ) -> std::io::Result<u64> {
        let deadline = Deadline::after_millis(milliseconds);
        let id = self.time_events.insert(
            deadline,
            TimeEvent {
                proc: Some(Box::new(proc)),
                finalizer,
            },
        )?;
        crate::debug!("{} add time event {id} at {deadline:?}", self.name);
        Ok(id)
    }

    /// Delete the timer `id` and run its finalizer.
    ///
    /// # Errors
    /// `ErrorKind::NotFound` if there is no such timer, e.g. it already returned
    /// [`TimerAction::NoMore`].
    pub fn delete_time_event(&mut self, id: u64) -> std::io::Result<()> {
        let entry = self.time_events.remove(id).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("time event {id} not found"))
        })?;
        crate::debug!("{} del time event {id}", self.name);
        self.finalize(entry.into_inner().finalizer);
        Ok(())
    }

    /// Returns `true` if the timer `id` is still registered.
    #[must_use]
    pub fn contains_time_event(&self, id: u64) -> bool {
        self.time_events.contains(id)
    }

    /// Returns the number of registered timers.
    #[must_use]
    pub fn time_events_len(&self) -> usize {
        self.time_events.len()
    }

    /// The earliest timer deadline, if any timer is registered.
    #[must_use]
    pub fn nearest_time_event(&self) -> Option<Deadline> {
        self.time_events.nearest()
    }

    /// Fire the due timers.
    ///
    /// Timers created while this runs have ids above the snapshot taken here and wait for
    /// the next pass. A timer fires at most once per call, even if it reschedules itself
    /// to a deadline that has already passed.
    pub(super) fn process_time_events(&mut self) -> usize {
        let Some(max_id) = self.time_events.max_id() else {
            return 0;
        };
        let mut fired = HashSet::new();
        let mut processed = 0;
        loop {
            let now = Deadline::now();
            let Some(id) = self
                .time_events
                .next_due(now, max_id, |id| fired.contains(&id))
            else {
                break;
            };
            _ = fired.insert(id);
            let Some(mut proc) = self
                .time_events
                .get_mut(id)
                .and_then(|entry| entry.get_mut().proc.take())
            else {
                continue;
            };
            let action = proc(self, id);
            processed += 1;
            match action {
                TimerAction::RescheduleAfter(milliseconds) => {
                    if let Some(entry) = self.time_events.get_mut(id) {
                        entry.get_mut().proc = Some(proc);
                        _ = self
                            .time_events
                            .reschedule(id, Deadline::after_millis(milliseconds));
                    }
                }
                TimerAction::NoMore => {
                    if self.time_events.contains(id) {
                        _ = self.delete_time_event(id);
                    }
                }
            }
        }
        processed
    }
}

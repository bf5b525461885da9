use std::fmt::{Debug, Display, Formatter};
use std::ops::BitOr;

/// Which registries a dispatch pass looks at.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct EventKinds(u8);

impl EventKinds {
    /// Nothing, a pass returns immediately.
    pub const NONE: EventKinds = EventKinds(0);

    /// File events.
    pub const FILE: EventKinds = EventKinds(1);

    /// Timers.
    pub const TIME: EventKinds = EventKinds(1 << 1);

    /// File events and timers.
    pub const ALL: EventKinds = EventKinds(0b11);

    /// Returns `true` if every kind of `other` is included.
    #[must_use]
    pub const fn contains(self, other: EventKinds) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no kind is included.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventKinds {
    type Output = EventKinds;

    fn bitor(self, rhs: Self) -> Self::Output {
        EventKinds(self.0 | rhs.0)
    }
}

/// Whether a dispatch pass may block in the selector.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum WaitPolicy {
    /// Block until a descriptor is ready or the nearest timer is due.
    #[default]
    Wait,
    /// Only handle what is ready right now.
    DontWait,
}

impl Display for WaitPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// What a timer callback wants done with its timer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TimerAction {
    /// Fire again this many milliseconds from now.
    RescheduleAfter(u64),
    /// Delete the timer, running its finalizer.
    NoMore,
}

impl Display for TimerAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

#![deny(
    // The following are allowed by default lints according to
    // https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_debug_implementations,
    missing_docs,
    // single_use_lifetimes, // allow anonymous lifetime
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unstable_features,
    unused_extern_crates,
    unused_import_braces,
    unused_results,

    clippy::all,
    // clippy::restriction,
    clippy::pedantic,
    // clippy::nursery, // It's still under development
    clippy::cargo,
)]
#![allow(
    // Some explicitly allowed Clippy lints, must have clear reason to allow
    clippy::blanket_clippy_restriction_lints, // allow clippy::restriction
    clippy::implicit_return, // actually omitting the return keyword is idiomatic Rust code
    clippy::module_name_repetitions, // repeation of module name in a struct name is not big deal
    clippy::multiple_crate_versions, // multi-version dependency crates is not able to fix
    clippy::panic_in_result_fn,
    clippy::shadow_same, // Not too much bad
    clippy::shadow_reuse, // Not too much bad
    clippy::exhaustive_enums,
    clippy::exhaustive_structs,
    clippy::indexing_slicing,
    clippy::separated_literal_suffix, // conflicts with clippy::unseparated_literal_suffix
    clippy::single_char_lifetime_names,
)]

//! Absolute `(seconds, milliseconds)` deadlines and an id-keyed table of timers.

use std::cmp::Ordering;
use std::io::{Error, ErrorKind};
use std::slice::{Iter, IterMut};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// get the current wall clock in ns
///
/// # Panics
/// if the time is before `UNIX_EPOCH`
#[must_use]
pub fn now() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("1970-01-01 00:00:00 UTC was {} seconds ago!")
            .as_nanos(),
    )
    .unwrap_or(u64::MAX)
}

/// An absolute wall clock time with millisecond resolution.
///
/// Deadlines order lexicographically on `(seconds, milliseconds)`,
/// the millisecond part is always kept in `[0, 1000)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Deadline {
    sec: u64,
    ms: u64,
}

impl Deadline {
    /// Creates a deadline, carrying whole seconds out of `ms`.
    #[must_use]
    pub fn new(sec: u64, ms: u64) -> Self {
        Deadline {
            sec: sec.saturating_add(ms / 1000),
            ms: ms % 1000,
        }
    }

    /// The current wall clock, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        let now = Duration::from_nanos(now());
        Deadline {
            sec: now.as_secs(),
            ms: u64::from(now.subsec_millis()),
        }
    }

    /// current time add `milliseconds`.
    #[must_use]
    pub fn after_millis(milliseconds: u64) -> Self {
        Self::now().add_millis(milliseconds)
    }

    /// Returns this deadline moved `milliseconds` later.
    #[must_use]
    pub fn add_millis(self, milliseconds: u64) -> Self {
        let mut sec = self.sec.saturating_add(milliseconds / 1000);
        let mut ms = self.ms + milliseconds % 1000;
        if ms >= 1000 {
            sec = sec.saturating_add(1);
            ms -= 1000;
        }
        Deadline { sec, ms }
    }

    /// Time left from `earlier` until this deadline, zero if it has already passed.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: Deadline) -> Duration {
        if self <= earlier {
            return Duration::ZERO;
        }
        let mut sec = self.sec - earlier.sec;
        let ms = if self.ms < earlier.ms {
            // borrow one second
            sec -= 1;
            self.ms + 1000 - earlier.ms
        } else {
            self.ms - earlier.ms
        };
        Duration::from_secs(sec) + Duration::from_millis(ms)
    }

    /// Returns `true` if `now` is at or beyond this deadline.
    #[must_use]
    pub fn has_passed(self, now: Deadline) -> bool {
        now >= self
    }

    /// Get the seconds part.
    #[must_use]
    pub fn get_sec(&self) -> u64 {
        self.sec
    }

    /// Get the milliseconds part, always less than 1000.
    #[must_use]
    pub fn get_ms(&self) -> u64 {
        self.ms
    }
}

/// A timer registered in a [`TimerTable`].
#[derive(Debug, Eq, PartialEq)]
pub struct TimerEntry<T> {
    id: u64,
    deadline: Deadline,
    inner: T,
}

impl<T> TimerEntry<T> {
    /// Get the id.
    #[must_use]
    pub fn get_id(&self) -> u64 {
        self.id
    }

    /// Get the deadline.
    #[must_use]
    pub fn get_deadline(&self) -> Deadline {
        self.deadline
    }

    /// Provides a reference to the payload.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Provides a mutable reference to the payload.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consumes the entry, returning the payload.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Timers keyed by a strictly monotonic id.
///
/// Entries are kept in registration order, which is also id order, so lookups by id
/// are binary searches. Ids are never reused, even after removal.
#[derive(Debug)]
pub struct TimerTable<T> {
    next_id: u64,
    entries: Vec<TimerEntry<T>>,
}

impl<T> Default for TimerTable<T> {
    fn default() -> Self {
        TimerTable {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TimerTable<T> {
    /// Creates an empty table with room for `capacity` timers.
    ///
    /// # Errors
    /// if the storage can not be allocated.
    pub fn with_capacity(capacity: usize) -> std::io::Result<Self> {
        let mut table = Self::default();
        table
            .entries
            .try_reserve(capacity)
            .map_err(|e| Error::new(ErrorKind::OutOfMemory, e))?;
        Ok(table)
    }

    /// Returns the number of timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is no timer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id the next inserted timer will get.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// The greatest id handed out so far, `None` if no timer was ever inserted.
    #[must_use]
    pub fn max_id(&self) -> Option<u64> {
        self.next_id.checked_sub(1)
    }

    /// Inserts `t` to fire at `deadline`, returns its id.
    ///
    /// Nothing changes when this fails, the id counter included.
    ///
    /// # Errors
    /// if the storage can not grow, or the ids are exhausted.
    pub fn insert(&mut self, deadline: Deadline, t: T) -> std::io::Result<u64> {
        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| Error::new(ErrorKind::Other, "timer ids exhausted"))?;
        self.entries
            .try_reserve(1)
            .map_err(|e| Error::new(ErrorKind::OutOfMemory, e))?;
        let id = self.next_id;
        self.next_id = next_id;
        self.entries.push(TimerEntry {
            id,
            deadline,
            inner: t,
        });
        Ok(id)
    }

    fn index_of(&self, id: u64) -> Option<usize> {
        self.entries.binary_search_by(|x| x.id.cmp(&id)).ok()
    }

    /// Returns `true` if the timer `id` is registered.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.index_of(id).is_some()
    }

    /// Provides a reference to the timer `id`.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&TimerEntry<T>> {
        self.index_of(id).map(|index| &self.entries[index])
    }

    /// Provides a mutable reference to the timer `id`.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut TimerEntry<T>> {
        self.index_of(id).map(|index| &mut self.entries[index])
    }

    /// Removes and returns the timer `id`, `None` if not found.
    pub fn remove(&mut self, id: u64) -> Option<TimerEntry<T>> {
        self.index_of(id).map(|index| self.entries.remove(index))
    }

    /// Moves the timer `id` to `deadline`, returns `false` if not found.
    pub fn reschedule(&mut self, id: u64, deadline: Deadline) -> bool {
        if let Some(entry) = self.get_mut(id) {
            entry.deadline = deadline;
            return true;
        }
        false
    }

    /// The earliest deadline, `None` if the table is empty.
    ///
    /// This is a linear scan over every timer.
    #[must_use]
    pub fn nearest(&self) -> Option<Deadline> {
        let mut nearest: Option<Deadline> = None;
        for entry in &self.entries {
            if nearest.map_or(true, |n| entry.deadline.cmp(&n) == Ordering::Less) {
                nearest = Some(entry.deadline);
            }
        }
        nearest
    }

    /// The first timer in registration order that is due at `now`, has an id not above
    /// `max_id` and is not rejected by `skip`.
    #[must_use]
    pub fn next_due(&self, now: Deadline, max_id: u64, skip: impl Fn(u64) -> bool) -> Option<u64> {
        self.entries
            .iter()
            .take_while(|entry| entry.id <= max_id)
            .find(|entry| entry.deadline.has_passed(now) && !skip(entry.id))
            .map(|entry| entry.id)
    }

    /// Returns a front-to-back iterator.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, TimerEntry<T>> {
        self.entries.iter()
    }

    /// Returns a front-to-back iterator that returns mutable references.
    pub fn iter_mut(&mut self) -> IterMut<'_, TimerEntry<T>> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test() {
        assert!(now() > 0);
        assert!(Deadline::now().get_sec() > 0);
    }

    #[test]
    fn deadline_carry() {
        assert_eq!(Deadline::new(1, 2500), Deadline::new(3, 500));
        let deadline = Deadline::new(10, 900).add_millis(250);
        assert_eq!((11, 150), (deadline.get_sec(), deadline.get_ms()));
        let deadline = Deadline::new(10, 0).add_millis(3999);
        assert_eq!((13, 999), (deadline.get_sec(), deadline.get_ms()));
    }

    #[test]
    fn deadline_borrow() {
        let deadline = Deadline::new(12, 100);
        assert_eq!(
            Duration::from_millis(1200),
            deadline.saturating_duration_since(Deadline::new(10, 900))
        );
        assert_eq!(
            Duration::from_millis(2050),
            deadline.saturating_duration_since(Deadline::new(10, 50))
        );
        assert_eq!(
            Duration::ZERO,
            deadline.saturating_duration_since(Deadline::new(12, 101))
        );
        assert!(deadline.has_passed(Deadline::new(12, 100)));
        assert!(!deadline.has_passed(Deadline::new(12, 99)));
    }

    #[test]
    fn nearest() -> std::io::Result<()> {
        let mut table = TimerTable::default();
        assert_eq!(None, table.nearest());
        _ = table.insert(Deadline::new(5, 0), "a")?;
        _ = table.insert(Deadline::new(3, 500), "b")?;
        _ = table.insert(Deadline::new(3, 200), "c")?;
        assert_eq!(Some(Deadline::new(3, 200)), table.nearest());
        Ok(())
    }

    #[test]
    fn ids_never_reused() -> std::io::Result<()> {
        let mut table = TimerTable::with_capacity(4)?;
        assert_eq!(None, table.max_id());
        let first = table.insert(Deadline::new(1, 0), 1)?;
        let second = table.insert(Deadline::new(1, 0), 2)?;
        assert!(second > first);
        assert_eq!(Some(2), table.remove(second).map(TimerEntry::into_inner));
        assert!(table.remove(second).is_none());
        let third = table.insert(Deadline::new(1, 0), 3)?;
        assert!(third > second);
        assert_eq!(Some(third), table.max_id());
        assert_eq!(2, table.len());
        Ok(())
    }

    #[test]
    fn next_due() -> std::io::Result<()> {
        let mut table = TimerTable::default();
        let late = table.insert(Deadline::new(9, 0), ())?;
        let a = table.insert(Deadline::new(2, 0), ())?;
        let b = table.insert(Deadline::new(1, 0), ())?;
        let now = Deadline::new(5, 0);
        // equal readiness breaks ties by registration order
        assert_eq!(Some(a), table.next_due(now, b, |_| false));
        assert_eq!(Some(b), table.next_due(now, b, |id| id == a));
        assert_eq!(None, table.next_due(now, a, |id| id == a));
        assert!(table.reschedule(late, Deadline::new(4, 999)));
        assert_eq!(Some(late), table.next_due(now, b, |_| false));
        assert!(!table.reschedule(42, now));
        Ok(())
    }
}

use std::fmt::{Display, Formatter};

/// Default number of file events reserved up front.
pub const DEFAULT_FILE_CAPACITY: usize = 64;

/// Default number of timers reserved up front.
pub const DEFAULT_TIME_CAPACITY: usize = 16;

/// Settings for building an [`EventLoop`](crate::event_loop::EventLoop).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    name: String,
    file_capacity: usize,
    time_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: format!("evloop-{}", uuid::Uuid::new_v4()),
            file_capacity: DEFAULT_FILE_CAPACITY,
            time_capacity: DEFAULT_TIME_CAPACITY,
        }
    }
}

impl Config {
    /// Set the name used to tell event loops apart in logs.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Get the event loop name.
    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Set how many file events to reserve room for when the loop is created.
    pub fn set_file_capacity(&mut self, file_capacity: usize) -> &mut Self {
        self.file_capacity = file_capacity;
        self
    }

    /// Get how many file events are reserved up front.
    #[must_use]
    pub fn get_file_capacity(&self) -> usize {
        self.file_capacity
    }

    /// Set how many timers to reserve room for when the loop is created.
    pub fn set_time_capacity(&mut self, time_capacity: usize) -> &mut Self {
        self.time_capacity = time_capacity;
        self
    }

    /// Get how many timers are reserved up front.
    #[must_use]
    pub fn get_time_capacity(&self) -> usize {
        self.time_capacity
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(file_capacity={}, time_capacity={})",
            self.name, self.file_capacity, self.time_capacity
        )
    }
}

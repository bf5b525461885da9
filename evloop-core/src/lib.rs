#![deny(
    // The following are allowed by default lints according to
    // https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
    anonymous_parameters,
    bare_trait_objects,
    // elided_lifetimes_in_paths, // allow anonymous lifetime
    missing_debug_implementations,
    missing_docs,
    // single_use_lifetimes,
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
    clippy::wildcard_imports,
    clippy::separated_literal_suffix, // conflicts with clippy::unseparated_literal_suffix
)]

//! A single-threaded, callback-driven reactor.
//!
//! An [`EventLoop`](event_loop::EventLoop) owns two registries, file events keyed by
//! `(descriptor, mask)` and timers keyed by a monotonic id, and dispatches their callbacks
//! from one thread. Callbacks receive the loop itself and may register or remove events
//! while they are being dispatched.
//!
//! ```
//! use evloop_core::event_loop::{EventLoop, TimerAction};
//!
//! let mut event_loop = EventLoop::default();
//! let mut left = 3;
//! _ = event_loop
//!     .create_time_event(
//!         1,
//!         move |event_loop, _id| {
//!             left -= 1;
//!             if left == 0 {
//!                 event_loop.stop();
//!                 return TimerAction::NoMore;
//!             }
//!             TimerAction::RescheduleAfter(1)
//!         },
//!         None,
//!     )
//!     .expect("create timer failed");
//! event_loop.run();
//! assert_eq!(0, event_loop.time_events_len());
//! ```

#[allow(missing_docs)]
pub mod log;

/// Common traits.
pub mod common;

/// Event loop settings.
pub mod config;

/// The reactor.
pub mod event_loop;

pub use evloop_net::mask::Mask;
pub use evloop_net::selector::{wait_one, Interests, PollSelector, Ready, Selector};
pub use evloop_timer::Deadline;

//! Platform-agnostic trait abstractions
//!
//! These traits decouple the estimator from the host platform so the
//! whole pipeline runs on bare metal and in host tests alike.

pub mod sync;
pub mod time;
pub mod watchdog;

pub use sync::{MockState, SharedState};
pub use time::{MockTime, TimeSource};
pub use watchdog::{MockWatchdog, Watchdog};

#[cfg(feature = "embassy")]
pub use sync::EmbassyState;

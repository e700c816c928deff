//! Core systems: logging, alarms, and platform-agnostic traits

pub mod alarms;
pub mod logging;
pub mod traits;

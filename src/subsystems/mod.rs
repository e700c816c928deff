//! Autopilot subsystems

pub mod attitude;

//! Device traits
//!
//! Hardware-independent trait definitions for the two sensors the
//! estimator consumes. These traits enable:
//! - Unit testing with mock implementations
//! - Sensor independence for the fusion pipeline
//! - Hardware changes without algorithm changes

pub mod accel;
pub mod gyro;

pub use accel::{AccelFifo, AccelSample};
pub use gyro::{GyroQueue, GyroSample};

/// Sensor-stage error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No gyro sample arrived within the receive timeout
    GyroTimeout,
    /// Accelerometer FIFO had no pending samples this cycle
    AccelNotReady,
}

impl SensorError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorError::GyroTimeout => "GyroTimeout",
            SensorError::AccelNotReady => "AccelNotReady",
        }
    }
}

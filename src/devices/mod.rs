//! Sensor driver surfaces
//!
//! The estimator never talks to hardware directly; it consumes the trait
//! surfaces defined here. Mock implementations live alongside for host
//! testing.

pub mod mock;
pub mod traits;

pub use mock::{MockAccelFifo, MockGyroQueue};
pub use traits::{AccelFifo, AccelSample, GyroQueue, GyroSample, SensorError};

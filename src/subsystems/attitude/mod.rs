//! Attitude estimation subsystem
//!
//! A complementary filter over a rate gyro and an accelerometer,
//! producing a unit-quaternion attitude and roll/pitch/yaw at the sensor
//! update rate. Heading is unobservable without a magnetometer: yaw
//! integrates the gyro and drifts, damped only by the weak yaw-bias sink.
//!
//! The pipeline per cycle:
//!
//! ```text
//!  gyro queue ──┐
//!               ├─> sensor stage ──> fusion ──> publication
//!  accel FIFO ──┘   (sensors.rs)   (filter.rs)  (records via task.rs)
//! ```

pub mod filter;
pub mod math;
pub mod records;
pub mod sensors;
pub mod task;

pub use filter::{ComplementaryFilter, FilterGains, GRAVITY_GATE};
pub use records::{ArmedState, AttitudeRecord, FlightStatus, SensorRecord, Telemetry};
pub use sensors::{SensorFrame, ACCEL_COUNT_SCALE, GYRO_NEUTRAL, MAX_ACCEL_DRAIN};
pub use task::{AttitudeTask, GYRO_TIMEOUT_MS, UPDATE_PERIOD_MS};

//! Gyroscope sample queue trait
//!
//! The rate gyro is sampled by the ADC at a fixed cadence and delivered
//! through a bounded queue, one four-element batch per update period.
//! The queue is what paces the estimator: the task blocks on `receive`
//! and runs a cycle per delivered batch, so the loop rate is governed by
//! the ADC configuration, not by a timer.

use super::SensorError;

/// One raw gyro batch from the ADC.
///
/// Index 0 is the gyro temperature channel; indices 1..=3 are the X/Y/Z
/// rate channels. All values are raw ADC counts.
pub type GyroSample = [f32; 4];

/// Bounded blocking queue of gyro sample batches.
///
/// Implementations:
/// - `ChannelGyroQueue` (platform module) over an Embassy channel fed by
///   the ADC interrupt
/// - `MockGyroQueue` for host testing
#[allow(async_fn_in_trait)]
pub trait GyroQueue {
    /// Wait up to `timeout_ms` for the next sample batch.
    ///
    /// Returns `SensorError::GyroTimeout` if no batch arrives in time,
    /// which the caller surfaces as an attitude alarm.
    async fn receive(&mut self, timeout_ms: u32) -> Result<GyroSample, SensorError>;
}

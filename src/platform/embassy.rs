//! Embassy platform integration
//!
//! Maps the estimator's trait surfaces onto Embassy primitives: the gyro
//! queue over a bounded channel fed from the ADC interrupt, and the time
//! source over the Embassy instant clock.

use crate::core::traits::TimeSource;
use crate::devices::traits::{GyroQueue, GyroSample, SensorError};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{with_timeout, Duration, Instant};

/// Bounded channel carrying raw gyro batches from the ADC interrupt.
///
/// Depth 2 allows one in-flight batch plus one back sample without the
/// producer ever blocking in interrupt context.
pub type GyroChannel = Channel<CriticalSectionRawMutex, GyroSample, 2>;

/// Consumer side of [`GyroChannel`].
pub struct ChannelGyroQueue<'a> {
    receiver: Receiver<'a, CriticalSectionRawMutex, GyroSample, 2>,
}

impl<'a> ChannelGyroQueue<'a> {
    pub fn new(channel: &'a GyroChannel) -> Self {
        Self {
            receiver: channel.receiver(),
        }
    }
}

impl GyroQueue for ChannelGyroQueue<'_> {
    async fn receive(&mut self, timeout_ms: u32) -> Result<GyroSample, SensorError> {
        with_timeout(
            Duration::from_millis(timeout_ms as u64),
            self.receiver.receive(),
        )
        .await
        .map_err(|_| SensorError::GyroTimeout)
    }
}

/// Millisecond tick counter over the Embassy clock.
#[derive(Clone, Default)]
pub struct EmbassyTime;

impl TimeSource for EmbassyTime {
    fn now_ticks(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

//! Mock sensor implementations for testing
//!
//! Configurable mocks for the gyro sample queue and the accelerometer
//! FIFO, so the fusion pipeline can be driven deterministically without
//! hardware.

use crate::devices::traits::{AccelFifo, AccelSample, GyroQueue, GyroSample, SensorError};

/// Mock gyro queue
///
/// Returns queued sample batches in order; once the queue is empty it
/// returns the default batch if one is set, otherwise times out.
pub struct MockGyroQueue {
    samples: heapless::Deque<GyroSample, 64>,
    default_sample: Option<GyroSample>,
}

impl MockGyroQueue {
    /// Create an empty queue (every receive times out).
    pub fn new() -> Self {
        Self {
            samples: heapless::Deque::new(),
            default_sample: None,
        }
    }

    /// Create a queue that repeats `sample` forever.
    pub fn repeating(sample: GyroSample) -> Self {
        Self {
            samples: heapless::Deque::new(),
            default_sample: Some(sample),
        }
    }

    /// Queue one sample batch.
    pub fn push(&mut self, sample: GyroSample) -> Result<(), GyroSample> {
        self.samples.push_back(sample)
    }

    /// Set or clear the batch returned when the queue is empty.
    pub fn set_default(&mut self, sample: Option<GyroSample>) {
        self.default_sample = sample;
    }
}

impl Default for MockGyroQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl GyroQueue for MockGyroQueue {
    async fn receive(&mut self, _timeout_ms: u32) -> Result<GyroSample, SensorError> {
        if let Some(sample) = self.samples.pop_front() {
            return Ok(sample);
        }
        self.default_sample.ok_or(SensorError::GyroTimeout)
    }
}

/// Mock accelerometer FIFO
///
/// Pops queued samples in order; once the queue is empty it yields the
/// default sample (reported as exactly one pending element per cycle) if
/// one is set, otherwise reports an empty FIFO.
pub struct MockAccelFifo {
    samples: heapless::Deque<AccelSample, 64>,
    default_sample: Option<AccelSample>,
}

impl MockAccelFifo {
    /// Create an empty FIFO.
    pub fn new() -> Self {
        Self {
            samples: heapless::Deque::new(),
            default_sample: None,
        }
    }

    /// Create a FIFO that yields `sample` once per drain forever.
    pub fn repeating(sample: AccelSample) -> Self {
        Self {
            samples: heapless::Deque::new(),
            default_sample: Some(sample),
        }
    }

    /// Queue one sample.
    pub fn push(&mut self, sample: AccelSample) -> Result<(), AccelSample> {
        self.samples.push_back(sample)
    }

    /// Set or clear the sample yielded when the queue is empty.
    pub fn set_default(&mut self, sample: Option<AccelSample>) {
        self.default_sample = sample;
    }
}

impl Default for MockAccelFifo {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelFifo for MockAccelFifo {
    fn fifo_elements(&self) -> usize {
        if !self.samples.is_empty() {
            self.samples.len()
        } else if self.default_sample.is_some() {
            1
        } else {
            0
        }
    }

    fn read(&mut self, out: &mut AccelSample) -> usize {
        if let Some(sample) = self.samples.pop_front() {
            *out = sample;
            self.samples.len()
        } else if let Some(sample) = self.default_sample {
            *out = sample;
            0
        } else {
            0
        }
    }
}

//! Shared telemetry records
//!
//! The estimator communicates with the rest of the system exclusively
//! through these records: it publishes the attitude and corrected-sensor
//! records plus its alarm every cycle, and consumes the flight status.
//! The bundle is shared behind `SharedState` so publication is atomic
//! with respect to readers.

use crate::core::alarms::AlarmSeverity;
use nalgebra::{Quaternion, Vector3};

/// Vehicle arming state, consumed by the gain schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmedState {
    #[default]
    Disarmed,
    Arming,
    Armed,
}

/// Flight status record (consumed).
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightStatus {
    pub armed: ArmedState,
}

/// Corrected sensor record (published every successful cycle).
#[derive(Debug, Clone, Copy)]
pub struct SensorRecord {
    /// Body rates after sign, rotation and bias correction, deg/s
    pub gyro: Vector3<f32>,
    /// Body acceleration after sign, rotation, bias and scale, m/s²
    pub accel: Vector3<f32>,
    /// Accel samples left in the FIFO after this cycle's drain
    pub samples_remaining: u8,
    /// Accel samples averaged into this cycle
    pub samples_consumed: u8,
}

impl Default for SensorRecord {
    fn default() -> Self {
        Self {
            gyro: Vector3::zeros(),
            accel: Vector3::zeros(),
            samples_remaining: 0,
            samples_consumed: 0,
        }
    }
}

/// Attitude record (published every successful cycle).
#[derive(Debug, Clone, Copy)]
pub struct AttitudeRecord {
    /// Unit quaternion, scalar part first, `q.w >= 0`
    pub q: Quaternion<f32>,
    /// Roll in degrees
    pub roll: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Yaw in degrees
    pub yaw: f32,
}

impl Default for AttitudeRecord {
    fn default() -> Self {
        Self {
            q: Quaternion::identity(),
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

/// Everything the estimator shares with other contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Telemetry {
    pub attitude: AttitudeRecord,
    pub raw: SensorRecord,
    pub alarm: AlarmSeverity,
    pub flight_status: FlightStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attitude_record_default_is_identity() {
        let record = AttitudeRecord::default();
        assert_eq!(record.q, Quaternion::identity());
        assert_eq!(record.roll, 0.0);
        assert_eq!(record.pitch, 0.0);
        assert_eq!(record.yaw, 0.0);
    }

    #[test]
    fn test_telemetry_default() {
        let telemetry = Telemetry::default();
        assert_eq!(telemetry.alarm, AlarmSeverity::Ok);
        assert_eq!(telemetry.flight_status.armed, ArmedState::Disarmed);
        assert_eq!(telemetry.raw.samples_consumed, 0);
    }
}

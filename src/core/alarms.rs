//! Attitude alarm severity
//!
//! The estimator surfaces its health through a single alarm slot in the
//! telemetry bundle. A successful cycle clears the alarm; there are no
//! latched error states.

/// Severity of the attitude alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmSeverity {
    /// Estimator producing fresh attitude data
    #[default]
    Ok,
    /// A cycle failed (gyro timeout or accel FIFO empty); recovers on the
    /// next successful cycle
    Error,
    /// Estimator has never produced data (startup gate)
    Critical,
}

impl AlarmSeverity {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmSeverity::Ok => "Ok",
            AlarmSeverity::Error => "Error",
            AlarmSeverity::Critical => "Critical",
        }
    }
}

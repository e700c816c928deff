//! Attitude Estimator Parameter Definitions
//!
//! Tuning block for the complementary filter and the sensor front-end.
//!
//! # Parameters
//!
//! - `ATT_ACC_KP` - Accel proportional gain on the gyro-rate channel
//! - `ATT_ACC_KI` - Accel integral gain feeding the gyro bias (per cycle)
//! - `ATT_YAW_BIAS` - Yaw bias sink rate
//! - `ATT_GYRO_GAIN` - Gyro counts → deg/s conversion gain
//! - `ATT_ACC_BIAS_{X,Y,Z}` - Accel zero offset in raw counts
//! - `ATT_GYR_BIAS_{X,Y,Z}` - Persisted gyro bias, stored ×100 deg/s
//! - `ATT_ROT_{RLL,PIT,YAW}` - Board-mount rotation in degrees
//! - `ATT_ZERO_ARM` - Re-run the high-gain bias capture while arming
//! - `ATT_BIAS_CORR` - Apply the tracked gyro bias to published rates

use super::error::ParameterError;
use super::storage::{ParamValue, ParameterStore};
use nalgebra::Vector3;

/// Attitude parameters loaded from the parameter store
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeParams {
    /// Proportional gain of the accel correction
    pub accel_kp: f32,
    /// Integral gain of the accel correction (applied per cycle)
    pub accel_ki: f32,
    /// Yaw bias sink rate
    pub yaw_bias_rate: f32,
    /// Gyro counts → deg/s gain
    pub gyro_gain: f32,
    /// Accel zero offset, raw counts
    pub accel_bias: [i16; 3],
    /// Persisted gyro bias, stored ×100 deg/s
    pub gyro_bias: [i32; 3],
    /// Board-mount rotation, roll/pitch/yaw degrees
    pub board_rotation: [f32; 3],
    /// Raise gains while the vehicle is arming
    pub zero_during_arming: bool,
    /// Feed the tracked bias back into published gyro rates
    pub bias_correct_gyro: bool,
}

impl Default for AttitudeParams {
    fn default() -> Self {
        Self {
            accel_kp: 0.05,
            accel_ki: 0.0001,
            yaw_bias_rate: 0.000_001,
            gyro_gain: 0.42,
            accel_bias: [0; 3],
            gyro_bias: [0; 3],
            board_rotation: [0.0; 3],
            zero_during_arming: false,
            bias_correct_gyro: true,
        }
    }
}

impl AttitudeParams {
    /// Register attitude parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        let defaults = Self::default();

        store.register("ATT_ACC_KP", ParamValue::Float(defaults.accel_kp))?;
        store.register("ATT_ACC_KI", ParamValue::Float(defaults.accel_ki))?;
        store.register("ATT_YAW_BIAS", ParamValue::Float(defaults.yaw_bias_rate))?;
        store.register("ATT_GYRO_GAIN", ParamValue::Float(defaults.gyro_gain))?;

        store.register("ATT_ACC_BIAS_X", ParamValue::Int(0))?;
        store.register("ATT_ACC_BIAS_Y", ParamValue::Int(0))?;
        store.register("ATT_ACC_BIAS_Z", ParamValue::Int(0))?;

        store.register("ATT_GYR_BIAS_X", ParamValue::Int(0))?;
        store.register("ATT_GYR_BIAS_Y", ParamValue::Int(0))?;
        store.register("ATT_GYR_BIAS_Z", ParamValue::Int(0))?;

        store.register("ATT_ROT_RLL", ParamValue::Float(0.0))?;
        store.register("ATT_ROT_PIT", ParamValue::Float(0.0))?;
        store.register("ATT_ROT_YAW", ParamValue::Float(0.0))?;

        store.register(
            "ATT_ZERO_ARM",
            ParamValue::Bool(defaults.zero_during_arming),
        )?;
        store.register("ATT_BIAS_CORR", ParamValue::Bool(defaults.bias_correct_gyro))?;

        Ok(())
    }

    /// Load attitude parameters from the store, falling back to defaults
    /// for anything missing or mistyped
    pub fn from_store(store: &ParameterStore) -> Self {
        let defaults = Self::default();

        Self {
            accel_kp: float_param(store, "ATT_ACC_KP", defaults.accel_kp),
            accel_ki: float_param(store, "ATT_ACC_KI", defaults.accel_ki),
            yaw_bias_rate: float_param(store, "ATT_YAW_BIAS", defaults.yaw_bias_rate),
            gyro_gain: float_param(store, "ATT_GYRO_GAIN", defaults.gyro_gain),
            accel_bias: [
                int_param(store, "ATT_ACC_BIAS_X", 0) as i16,
                int_param(store, "ATT_ACC_BIAS_Y", 0) as i16,
                int_param(store, "ATT_ACC_BIAS_Z", 0) as i16,
            ],
            gyro_bias: [
                int_param(store, "ATT_GYR_BIAS_X", 0),
                int_param(store, "ATT_GYR_BIAS_Y", 0),
                int_param(store, "ATT_GYR_BIAS_Z", 0),
            ],
            board_rotation: [
                float_param(store, "ATT_ROT_RLL", 0.0),
                float_param(store, "ATT_ROT_PIT", 0.0),
                float_param(store, "ATT_ROT_YAW", 0.0),
            ],
            zero_during_arming: bool_param(store, "ATT_ZERO_ARM", defaults.zero_during_arming),
            bias_correct_gyro: bool_param(store, "ATT_BIAS_CORR", defaults.bias_correct_gyro),
        }
    }

    /// Persisted gyro bias converted to deg/s
    pub fn gyro_bias_dps(&self) -> Vector3<f32> {
        Vector3::new(
            self.gyro_bias[0] as f32 / 100.0,
            self.gyro_bias[1] as f32 / 100.0,
            self.gyro_bias[2] as f32 / 100.0,
        )
    }

    /// True if a board-mount rotation is configured
    pub fn has_board_rotation(&self) -> bool {
        self.board_rotation != [0.0; 3]
    }
}

fn float_param(store: &ParameterStore, name: &str, default: f32) -> f32 {
    match store.get(name) {
        Some(ParamValue::Float(v)) => *v,
        Some(ParamValue::Int(v)) => *v as f32,
        _ => default,
    }
}

fn int_param(store: &ParameterStore, name: &str, default: i32) -> i32 {
    match store.get(name) {
        Some(ParamValue::Int(v)) => *v,
        Some(ParamValue::Float(v)) => *v as i32,
        _ => default,
    }
}

fn bool_param(store: &ParameterStore, name: &str, default: bool) -> bool {
    match store.get(name) {
        Some(ParamValue::Bool(v)) => *v,
        Some(ParamValue::Int(v)) => *v != 0,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_defaults() {
        let mut store = ParameterStore::new();
        AttitudeParams::register_defaults(&mut store).unwrap();

        assert!(store.get("ATT_ACC_KP").is_some());
        assert!(store.get("ATT_GYRO_GAIN").is_some());
        assert!(store.get("ATT_BIAS_CORR").is_some());
        assert_eq!(store.len(), 15);
    }

    #[test]
    fn test_from_store_defaults() {
        let mut store = ParameterStore::new();
        AttitudeParams::register_defaults(&mut store).unwrap();

        let params = AttitudeParams::from_store(&store);
        assert_eq!(params, AttitudeParams::default());
        assert!((params.gyro_gain - 0.42).abs() < f32::EPSILON);
        assert!(params.bias_correct_gyro);
        assert!(!params.zero_during_arming);
    }

    #[test]
    fn test_from_store_custom_values() {
        let mut store = ParameterStore::new();
        AttitudeParams::register_defaults(&mut store).unwrap();

        store.set("ATT_ACC_KP", ParamValue::Float(1.5)).unwrap();
        store.set("ATT_ACC_BIAS_Y", ParamValue::Int(-12)).unwrap();
        store.set("ATT_ROT_RLL", ParamValue::Float(180.0)).unwrap();
        store.set("ATT_ZERO_ARM", ParamValue::Bool(true)).unwrap();

        let params = AttitudeParams::from_store(&store);
        assert!((params.accel_kp - 1.5).abs() < f32::EPSILON);
        assert_eq!(params.accel_bias[1], -12);
        assert!((params.board_rotation[0] - 180.0).abs() < f32::EPSILON);
        assert!(params.zero_during_arming);
        assert!(params.has_board_rotation());
    }

    #[test]
    fn test_gyro_bias_scaling() {
        let params = AttitudeParams {
            gyro_bias: [100, -250, 42],
            ..Default::default()
        };

        let bias = params.gyro_bias_dps();
        assert!((bias.x - 1.0).abs() < f32::EPSILON);
        assert!((bias.y + 2.5).abs() < f32::EPSILON);
        assert!((bias.z - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn test_no_board_rotation_by_default() {
        assert!(!AttitudeParams::default().has_board_rotation());
    }
}

//! Complementary attitude filter
//!
//! Integrates body rates into a quaternion and continuously corrects the
//! result toward the accelerometer's gravity direction. Correction is a
//! PI feedback on the gyro-rate channel: the proportional term steers the
//! integration, the integral term tracks the slowly-moving gyro bias.
//!
//! The accel correction is gated by magnitude (free-fall and high-g
//! readings carry no usable gravity direction) and discounted by the tilt
//! a coordinated turn would induce. Yaw is unobservable from gravity; its
//! bias channel is driven only by the weak sink in the sensor stage.

use super::math::{body_gravity, canonicalize, quaternion_to_rpy};
use crate::parameters::AttitudeParams;
use libm::{acosf, fabsf, sqrtf};
use nalgebra::{Quaternion, Vector3};

/// 1 g threshold for accel gating and the turn-displacement angle.
///
/// Slightly under standard gravity to tolerate badly calibrated accels
/// and local gravity variation.
pub const GRAVITY_GATE: f32 = 9.8;

/// Quaternion norm below which the state is considered degenerate.
const QUAT_NORM_FLOOR: f32 = 1e-3;

/// Complementary-filter feedback gains.
///
/// `ki` is applied per cycle, without a time-step factor; `kp` is divided
/// by the time step when it feeds the rate channel. Tunings are calibrated
/// against both characteristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterGains {
    /// Proportional gain on the gyro-rate channel
    pub kp: f32,
    /// Integral gain feeding the gyro bias, X and Y only
    pub ki: f32,
    /// Yaw bias sink rate
    pub yaw_bias_rate: f32,
}

impl FilterGains {
    /// High-gain schedule used while bootstrapping and, optionally, while
    /// the vehicle is arming: snaps the attitude onto the accel reference
    /// and captures the gyro bias quickly.
    pub const BOOTSTRAP: FilterGains = FilterGains {
        kp: 1.0,
        ki: 0.9,
        yaw_bias_rate: 0.23,
    };

    /// Gains from the settings snapshot.
    pub fn from_params(params: &AttitudeParams) -> Self {
        Self {
            kp: params.accel_kp,
            ki: params.accel_ki,
            yaw_bias_rate: params.yaw_bias_rate,
        }
    }
}

impl Default for FilterGains {
    fn default() -> Self {
        Self::from_params(&AttitudeParams::default())
    }
}

/// Quaternion attitude state with gyro bias tracking.
pub struct ComplementaryFilter {
    q: Quaternion<f32>,
    /// Accumulated rate correction, deg/s, added to measured rates
    bias: Vector3<f32>,
    gains: FilterGains,
}

impl ComplementaryFilter {
    /// Create a filter at identity attitude with zero bias.
    pub fn new(gains: FilterGains) -> Self {
        Self {
            q: Quaternion::identity(),
            bias: Vector3::zeros(),
            gains,
        }
    }

    /// Current attitude quaternion (unit norm, scalar part >= 0).
    pub fn quaternion(&self) -> Quaternion<f32> {
        self.q
    }

    /// Current attitude as roll/pitch/yaw degrees.
    pub fn rpy(&self) -> (f32, f32, f32) {
        quaternion_to_rpy(&self.q)
    }

    /// Restore a saved attitude (warm start).
    pub fn set_quaternion(&mut self, q: Quaternion<f32>) {
        self.q = q;
    }

    /// Current gyro bias correction, deg/s.
    pub fn bias(&self) -> Vector3<f32> {
        self.bias
    }

    /// Seed the bias channel, e.g. from persisted calibration.
    pub fn seed_bias(&mut self, bias: Vector3<f32>) {
        self.bias = bias;
    }

    pub fn gains(&self) -> FilterGains {
        self.gains
    }

    pub fn set_gains(&mut self, gains: FilterGains) {
        self.gains = gains;
    }

    /// Drive the yaw bias toward the value that zeros the mean measured
    /// yaw rate. Most airframes cannot observe yaw from gravity, but they
    /// also spend most of their time not yawing.
    pub fn sink_yaw_bias(&mut self, gyro_z: f32) {
        self.bias.z -= gyro_z * self.gains.yaw_bias_rate;
    }

    /// Advance the attitude by one cycle.
    ///
    /// `gyro` in deg/s (bias already applied by the sensor stage when
    /// enabled), `accel` in m/s², `dt` in seconds.
    pub fn update(&mut self, gyro: Vector3<f32>, accel: Vector3<f32>, dt: f32) {
        let err = self.gravity_error(accel);

        // Integral feedback accumulates on X and Y only; the yaw channel
        // is owned by the sink above.
        self.bias.x += err.x * self.gains.ki;
        self.bias.y += err.y * self.gains.ki;

        let rates = gyro + err * (self.gains.kp / dt);
        self.integrate(rates, dt);
    }

    /// Rotation-vector error between the measured accel direction and the
    /// attitude's body-frame gravity, gated and turn-discounted.
    fn gravity_error(&self, accel: Vector3<f32>) -> Vector3<f32> {
        let grot = body_gravity(&self.q);

        // Cross product gives the rotation axis; stretch it to the angle
        // between the two vectors so the magnitude is meaningful.
        let mut err = accel.cross(&grot);

        let norms = accel.norm() * grot.norm();
        let phi = if norms > 0.0 {
            acosf(clampf(accel.dot(&grot) / norms, -1.0, 1.0))
        } else {
            0.0
        };

        let err_mag = err.norm();
        if err_mag > 0.0 {
            err *= phi / err_mag;
        }

        let accel_mag = accel.norm();
        if accel_mag <= GRAVITY_GATE || accel_mag > 1.5 * GRAVITY_GATE {
            // Below 1 g implies falling; far above it, the reading is
            // dominated by maneuvering. Neither carries a usable gravity
            // direction.
            return Vector3::zeros();
        }

        // The only sustained maneuver that skews the accel is a turn:
        // linear accelerations equalize against drag, and vertical
        // components alternate and cancel. The centripetal component is
        // perpendicular to gravity, so the apparent tilt it induces is
        // acos(g/|a|). Discount that much of the error, keeping its
        // direction as the best guess of where the correction belongs.
        let displacement = acosf(GRAVITY_GATE / accel_mag);
        let length = err.norm();
        if length > 0.0 {
            err -= err * (displacement / length);
        }

        err
    }

    /// First-order quaternion integration of body rates in deg/s.
    fn integrate(&mut self, rates: Vector3<f32>, dt: f32) {
        let (q0, q1, q2, q3) = (self.q.w, self.q.i, self.q.j, self.q.k);
        let (gx, gy, gz) = (rates.x, rates.y, rates.z);

        // deg/s -> rad/s and the quaternion-derivative half folded into
        // one factor
        let f = dt * core::f32::consts::PI / 360.0;

        let qdot0 = (-q1 * gx - q2 * gy - q3 * gz) * f;
        let qdot1 = (q0 * gx - q3 * gy + q2 * gz) * f;
        let qdot2 = (q3 * gx + q0 * gy - q1 * gz) * f;
        let qdot3 = (-q2 * gx + q1 * gy + q0 * gz) * f;

        let q = Quaternion::new(q0 + qdot0, q1 + qdot1, q2 + qdot2, q3 + qdot3);
        let q = canonicalize(q);

        let mag = sqrtf(q.w * q.w + q.i * q.i + q.j * q.j + q.k * q.k);
        self.q = Quaternion::new(q.w / mag, q.i / mag, q.j / mag, q.k / mag);

        // Degenerate or NaN state cannot be recovered by normalization
        if fabsf(mag) < QUAT_NORM_FLOOR || mag.is_nan() {
            self.q = Quaternion::identity();
        }
    }
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(FilterGains::default())
    }
}

fn clampf(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

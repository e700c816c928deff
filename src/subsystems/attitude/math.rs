//! Quaternion and Euler conversions
//!
//! Explicit conversion routines in the RPY convention used by every
//! consumer of the attitude record: roll about X, pitch about Y, yaw
//! about Z, all in degrees, quaternion scalar-first with `q0 >= 0`.

use libm::{asinf, atan2f, cosf, fabsf, sinf};
use nalgebra::{Matrix3, Quaternion, Vector3};

const DEG2RAD: f32 = core::f32::consts::PI / 180.0;
const RAD2DEG: f32 = 180.0 / core::f32::consts::PI;

/// Convert roll/pitch/yaw in degrees to a quaternion on the `q0 >= 0`
/// hemisphere.
pub fn rpy_to_quaternion(rpy: [f32; 3]) -> Quaternion<f32> {
    let phi = DEG2RAD * rpy[0] / 2.0;
    let theta = DEG2RAD * rpy[1] / 2.0;
    let psi = DEG2RAD * rpy[2] / 2.0;

    let q = Quaternion::new(
        cosf(phi) * cosf(theta) * cosf(psi) + sinf(phi) * sinf(theta) * sinf(psi),
        sinf(phi) * cosf(theta) * cosf(psi) - cosf(phi) * sinf(theta) * sinf(psi),
        cosf(phi) * sinf(theta) * cosf(psi) + sinf(phi) * cosf(theta) * sinf(psi),
        cosf(phi) * cosf(theta) * sinf(psi) - sinf(phi) * sinf(theta) * cosf(psi),
    );

    canonicalize(q)
}

/// Convert a quaternion to roll/pitch/yaw in degrees.
pub fn quaternion_to_rpy(q: &Quaternion<f32>) -> (f32, f32, f32) {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    let r13 = 2.0 * (q1 * q3 - q0 * q2);
    let r11 = q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3;
    let r12 = 2.0 * (q1 * q2 + q0 * q3);
    let r23 = 2.0 * (q2 * q3 + q0 * q1);
    let r33 = q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3;

    let pitch = if fabsf(r13) >= 1.0 {
        libm::copysignf(core::f32::consts::FRAC_PI_2, -r13)
    } else {
        asinf(-r13)
    };

    let roll = atan2f(r23, r33);
    let yaw = atan2f(r12, r11);

    (roll * RAD2DEG, pitch * RAD2DEG, yaw * RAD2DEG)
}

/// Build the rotation matrix of a quaternion, for rotating sensor
/// vectors into the corrected frame with `R * v`.
pub fn quaternion_to_rotation(q: &Quaternion<f32>) -> Matrix3<f32> {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    Matrix3::new(
        q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3,
        2.0 * (q1 * q2 + q0 * q3),
        2.0 * (q1 * q3 - q0 * q2),
        2.0 * (q1 * q2 - q0 * q3),
        q0 * q0 - q1 * q1 + q2 * q2 - q3 * q3,
        2.0 * (q2 * q3 + q0 * q1),
        2.0 * (q1 * q3 + q0 * q2),
        2.0 * (q2 * q3 - q0 * q1),
        q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3,
    )
}

/// Flip a quaternion onto the `q0 >= 0` hemisphere.
pub fn canonicalize(q: Quaternion<f32>) -> Quaternion<f32> {
    if q.w < 0.0 {
        Quaternion::new(-q.w, -q.i, -q.j, -q.k)
    } else {
        q
    }
}

/// Gravity direction (0,0,-1) expressed in body frame via `q`.
pub fn body_gravity(q: &Quaternion<f32>) -> Vector3<f32> {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    Vector3::new(
        -(2.0 * (q1 * q3 - q0 * q2)),
        -(2.0 * (q2 * q3 + q0 * q1)),
        -(q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3),
    )
}

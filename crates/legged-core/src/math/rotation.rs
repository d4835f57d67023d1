//! SO(3) rotation utilities
//!
//! Small helpers around `nalgebra` rotations used by the error-state filter
//! Jacobians and the kinematic pseudo-measurement.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Skew-symmetric matrix from vector (hat operator)
///
/// For v = [x, y, z]^T:
/// ```text
/// [v]× = [ 0  -z   y]
///        [ z   0  -x]
///        [-y   x   0]
/// ```
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Rotation matrix from quaternion
pub fn rotation_matrix(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    q.to_rotation_matrix().into_inner()
}

/// Incremental rotation from a body-frame angular rate over one step
///
/// q ⊞ ω·dt, the exponential of the scaled rotation vector.
pub fn integrate_angular_rate(
    q: &UnitQuaternion<f64>,
    omega: &Vector3<f64>,
    dt: f64,
) -> UnitQuaternion<f64> {
    q * UnitQuaternion::from_scaled_axis(omega * dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_skew_antisymmetric() {
        let v = Vector3::new(1.0, -2.0, 3.0);
        let s = skew(&v);
        assert_relative_eq!(s + s.transpose(), Matrix3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_skew_cross_product() {
        let a = Vector3::new(0.3, 0.1, -0.7);
        let b = Vector3::new(-1.2, 0.4, 2.0);
        assert_relative_eq!(skew(&a) * b, a.cross(&b), epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_angular_rate() {
        let q = UnitQuaternion::identity();
        let omega = Vector3::new(FRAC_PI_2, 0.0, 0.0);
        let q1 = integrate_angular_rate(&q, &omega, 1.0);
        assert_relative_eq!(
            q1,
            UnitQuaternion::from_euler_angles(FRAC_PI_2, 0.0, 0.0),
            epsilon = 1e-10
        );
    }
}

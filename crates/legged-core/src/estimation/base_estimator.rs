//! Error-state Kalman filter over the base pose/velocity/bias manifold
//!
//! The nominal state (orientation as a unit quaternion, velocity, position,
//! accelerometer bias, gyroscope bias) is integrated directly from the
//! filtered IMU channels; the filter estimates the 15-dimensional error
//! state
//!
//! ```text
//! δx = [δp, δv, δθ, δb_a, δb_g]
//! ```
//!
//! which stays small and linear even though the orientation lives on SO(3).
//! Corrections come from kinematic pseudo-measurements of the base velocity
//! derived from planted feet; after each correction the error is injected
//! into the nominal state and the quaternion is renormalized.

use nalgebra::{Matrix3, SMatrix, SVector, UnitQuaternion};

use crate::math::{integrate_angular_rate, rotation_matrix, skew};
use crate::{gravity_world, Quat, Vec3};

use super::settings::NoiseParams;

/// Error-state dimension: δp(3) + δv(3) + δθ(3) + δb_a(3) + δb_g(3)
pub const ERROR_DIM: usize = 15;

const DP: usize = 0;
const DV: usize = 3;
const DTHETA: usize = 6;
const DBA: usize = 9;
const DBG: usize = 12;

/// Base-state fusion filter
#[derive(Debug, Clone)]
pub struct BaseStateEstimator {
    /// Base position in the world frame [m]
    position: Vec3,
    /// Base velocity in the world frame [m/s]
    velocity: Vec3,
    /// Base orientation, world from base
    orientation: Quat,
    /// Accelerometer bias [m/s²]
    accel_bias: Vec3,
    /// Gyroscope bias [rad/s]
    gyro_bias: Vec3,
    /// Error-state covariance
    covariance: SMatrix<f64, ERROR_DIM, ERROR_DIM>,
    noise: NoiseParams,
    gravity: Vec3,
}

impl BaseStateEstimator {
    pub fn new(noise: NoiseParams) -> Self {
        Self {
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            orientation: Quat::identity(),
            accel_bias: Vec3::zeros(),
            gyro_bias: Vec3::zeros(),
            covariance: SMatrix::identity() * 1e-2,
            noise,
            gravity: gravity_world(),
        }
    }

    /// Re-initialize the nominal state from a prior, resetting the
    /// covariance to a small diagonal
    pub fn initialize(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.velocity = Vec3::zeros();
        self.orientation = orientation;
        self.accel_bias = Vec3::zeros();
        self.gyro_bias = Vec3::zeros();
        self.covariance = SMatrix::identity() * 1e-2;
    }

    /// Propagate the nominal state and covariance by one step of filtered
    /// IMU data (body-frame angular rate and specific force)
    pub fn propagate(&mut self, gyro: &Vec3, lin_accel: &Vec3, dt: f64) {
        let omega = gyro - self.gyro_bias;
        let accel_body = lin_accel - self.accel_bias;

        let rot = rotation_matrix(&self.orientation);
        let accel_world = rot * accel_body + self.gravity;
        let delta_q = UnitQuaternion::from_scaled_axis(omega * dt);

        // Nominal kinematics
        self.position += self.velocity * dt + 0.5 * accel_world * dt * dt;
        self.velocity += accel_world * dt;
        self.orientation = integrate_angular_rate(&self.orientation, &omega, dt);

        // Discretized error-state transition
        let identity_dt = Matrix3::identity() * dt;
        let mut f = SMatrix::<f64, ERROR_DIM, ERROR_DIM>::identity();
        f.fixed_view_mut::<3, 3>(DP, DV).copy_from(&identity_dt);
        f.fixed_view_mut::<3, 3>(DV, DTHETA)
            .copy_from(&(-rot * skew(&accel_body) * dt));
        f.fixed_view_mut::<3, 3>(DV, DBA).copy_from(&(-rot * dt));
        f.fixed_view_mut::<3, 3>(DTHETA, DTHETA)
            .copy_from(&delta_q.to_rotation_matrix().into_inner().transpose());
        f.fixed_view_mut::<3, 3>(DTHETA, DBG)
            .copy_from(&(-identity_dt));

        self.covariance = f * self.covariance * f.transpose();

        // Process noise on the diagonal: white IMU noise enters over dt²,
        // the bias random walks over dt
        let var_accel = self.noise.accel_noise * self.noise.accel_noise * dt * dt;
        let var_gyro = self.noise.gyro_noise * self.noise.gyro_noise * dt * dt;
        let var_ba = self.noise.accel_bias_noise * self.noise.accel_bias_noise * dt;
        let var_bg = self.noise.gyro_bias_noise * self.noise.gyro_bias_noise * dt;
        for i in 0..3 {
            self.covariance[(DV + i, DV + i)] += var_accel;
            self.covariance[(DTHETA + i, DTHETA + i)] += var_gyro;
            self.covariance[(DBA + i, DBA + i)] += var_ba;
            self.covariance[(DBG + i, DBG + i)] += var_bg;
        }
    }

    /// Correct with a base-velocity pseudo-measurement from one planted foot
    ///
    /// `variance` is the 3x3 measurement covariance, typically the fixed
    /// kinematic noise widened by the contact estimator's adaptive
    /// covariance for that leg. Returns `false` if the innovation
    /// covariance is not invertible, in which case the state is untouched.
    pub fn correct_velocity(&mut self, velocity_meas: &Vec3, variance: &Matrix3<f64>) -> bool {
        let mut h = SMatrix::<f64, 3, ERROR_DIM>::zeros();
        h.fixed_view_mut::<3, 3>(0, DV)
            .copy_from(&Matrix3::identity());

        let innovation = velocity_meas - self.velocity;

        // S = H P H^T + R
        let s = h * self.covariance * h.transpose() + variance;
        let Some(s_inv) = s.try_inverse() else {
            log::warn!("singular innovation covariance, dropping contact correction");
            return false;
        };

        // K = P H^T S^{-1}
        let gain = self.covariance * h.transpose() * s_inv;
        let error: SVector<f64, ERROR_DIM> = gain * innovation;

        // Joseph form keeps the covariance symmetric positive semi-definite
        let i_kh = SMatrix::<f64, ERROR_DIM, ERROR_DIM>::identity() - gain * h;
        self.covariance =
            i_kh * self.covariance * i_kh.transpose() + gain * variance * gain.transpose();
        self.covariance = (self.covariance + self.covariance.transpose()) * 0.5;

        // Inject the error state into the nominal state
        self.position += error.fixed_rows::<3>(DP);
        self.velocity += error.fixed_rows::<3>(DV);
        self.orientation *=
            UnitQuaternion::from_scaled_axis(error.fixed_rows::<3>(DTHETA).into_owned());
        self.orientation.renormalize();
        self.accel_bias += error.fixed_rows::<3>(DBA);
        self.gyro_bias += error.fixed_rows::<3>(DBG);
        true
    }

    /// Base position in the world frame [m]
    pub fn position(&self) -> &Vec3 {
        &self.position
    }

    /// Base velocity in the world frame [m/s]
    pub fn velocity(&self) -> &Vec3 {
        &self.velocity
    }

    /// Base orientation, world from base
    pub fn orientation(&self) -> &Quat {
        &self.orientation
    }

    /// Accelerometer bias estimate [m/s²]
    pub fn accel_bias(&self) -> &Vec3 {
        &self.accel_bias
    }

    /// Gyroscope bias estimate [rad/s]
    pub fn gyro_bias(&self) -> &Vec3 {
        &self.gyro_bias
    }

    /// Error-state covariance
    pub fn covariance(&self) -> &SMatrix<f64, ERROR_DIM, ERROR_DIM> {
        &self.covariance
    }
}

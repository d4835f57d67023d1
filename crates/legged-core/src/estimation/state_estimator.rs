//! Per-cycle estimation orchestrator
//!
//! Sequences the pipeline once per fixed `dt`:
//! raw channels through the low-pass bank, contact estimation from filtered
//! torque and robot dynamics, base-state propagation from filtered IMU, and
//! the kinematic correction gated by the contact probabilities.

use nalgebra::{DVector, Matrix3, SMatrix, Vector3};

use crate::contact::{ContactEstimator, SettingsError};
use crate::math::rotation_matrix;
use crate::robot::Robot;
use crate::signal::LowPassFilterBank;
use crate::{Quat, Vec3};

use super::base_estimator::{BaseStateEstimator, ERROR_DIM};
use super::settings::StateEstimatorSettings;

/// One raw sensor batch per control cycle
#[derive(Debug, Clone)]
pub struct SensorBatch<'a> {
    /// Raw gyroscope reading, body frame [rad/s]
    pub gyro: Vector3<f64>,
    /// Raw linear acceleration (specific force), body frame [m/s²]
    pub lin_accel: Vector3<f64>,
    /// Raw joint velocities [rad/s]
    pub joint_velocity: &'a DVector<f64>,
    /// Raw joint accelerations [rad/s²]
    pub joint_acceleration: &'a DVector<f64>,
    /// Raw joint torques [N·m]
    pub joint_torque: &'a DVector<f64>,
    /// Raw per-leg force-sensor readings [N]
    pub force_sensor: &'a [f64],
}

/// Composed state estimator: filter bank, contact estimator and base-state
/// fusion filter driven once per control cycle
#[derive(Debug, Clone)]
pub struct StateEstimator {
    settings: StateEstimatorSettings,
    filters: LowPassFilterBank,
    contact_estimator: ContactEstimator,
    base_estimator: BaseStateEstimator,
}

impl StateEstimator {
    /// Build the pipeline for `robot`, validating the per-leg settings
    /// against its contact count
    pub fn new<R: Robot>(
        robot: &R,
        settings: StateEstimatorSettings,
    ) -> Result<Self, SettingsError> {
        let num_joints = 3 * robot.num_contacts();
        let contact_estimator =
            ContactEstimator::new(robot, settings.contact_estimator.clone(), settings.dt)?;
        let filters = LowPassFilterBank::new(settings.dt, &settings.lpf_cutoffs, num_joints);
        let base_estimator = BaseStateEstimator::new(settings.noise_params);
        Ok(Self {
            settings,
            filters,
            contact_estimator,
            base_estimator,
        })
    }

    /// Re-initialize the base state from a prior pose
    pub fn initialize(&mut self, position: Vec3, orientation: Quat) {
        self.base_estimator.initialize(position, orientation);
    }

    /// Run one estimation cycle
    ///
    /// `robot` must already hold the dynamics results for the current joint
    /// configuration. Ordering within the cycle is strict: filters feed the
    /// contact and propagation steps, and the contact update completes
    /// before the fusion correction.
    pub fn update<R: Robot>(&mut self, robot: &R, batch: &SensorBatch<'_>) {
        let dt = self.settings.dt;

        // Condition the raw channels
        let gyro = self.filters.gyro.update(&batch.gyro);
        let lin_accel = self.filters.lin_accel.update(&batch.lin_accel);
        let joint_velocity = self.filters.joint_velocity.update(batch.joint_velocity).clone();
        self.filters.joint_acceleration.update(batch.joint_acceleration);
        let joint_torque = self.filters.joint_torque.update(batch.joint_torque).clone();

        // Contact estimation from the filtered torque channel
        self.contact_estimator
            .update(robot, &joint_torque, batch.force_sensor);

        // Base-state propagation from the filtered IMU channels
        self.base_estimator.propagate(&gyro, &lin_accel, dt);

        // Kinematic correction from every leg classified as in contact
        let threshold = self.settings.contact_probability_threshold;
        let omega = gyro - self.base_estimator.gyro_bias();
        let rot = rotation_matrix(self.base_estimator.orientation());
        let kinematic_var = self.settings.noise_params.contact_noise.powi(2);

        let mut corrected = 0usize;
        for (leg, in_contact) in self.contact_estimator.contact_state(threshold) {
            if !in_contact {
                continue;
            }
            // The adaptive covariance inherits non-finite values from a
            // degenerate force reconstruction for one recovery cycle;
            // feeding one to the filter would poison the base state
            let contact_cov = self.contact_estimator.contact_covariance(leg);
            if !contact_cov.is_finite() {
                log::debug!("leg {leg} contact covariance non-finite, correction dropped");
                continue;
            }

            // A planted foot is stationary: the base velocity observed
            // through leg odometry is v = -R (J q̇ + ω × p_foot)
            let foot_vel_base = robot.joint_contact_jacobian(leg)
                * joint_velocity.fixed_rows::<3>(3 * leg)
                + omega.cross(&robot.contact_frame_position(leg));
            let velocity_meas = -rot * foot_vel_base;

            // Fixed kinematic noise widened by the leg's force volatility
            let variance = Matrix3::from_diagonal_element(kinematic_var + contact_cov);
            if self
                .base_estimator
                .correct_velocity(&velocity_meas, &variance)
            {
                corrected += 1;
            }
        }
        if corrected == 0 {
            // Flight phase or full slip: drift under propagation alone
            // until contact resumes
            log::debug!("no leg in contact, base correction skipped this cycle");
        } else {
            log::trace!("base state corrected from {corrected} contact legs");
        }
    }

    /// Base position in the world frame [m]
    pub fn base_position(&self) -> &Vec3 {
        self.base_estimator.position()
    }

    /// Base velocity in the world frame [m/s]
    pub fn base_velocity(&self) -> &Vec3 {
        self.base_estimator.velocity()
    }

    /// Base orientation, world from base
    pub fn base_orientation(&self) -> &Quat {
        self.base_estimator.orientation()
    }

    /// Error-state covariance of the fusion filter
    pub fn base_covariance(&self) -> &SMatrix<f64, ERROR_DIM, ERROR_DIM> {
        self.base_estimator.covariance()
    }

    /// Per-leg contact classification at the configured threshold
    pub fn contact_state(&self) -> Vec<(usize, bool)> {
        self.contact_estimator
            .contact_state(self.settings.contact_probability_threshold)
    }

    /// Aggregate adaptive contact covariance at the configured threshold
    pub fn contact_force_covariance(&self) -> f64 {
        self.contact_estimator
            .contact_force_covariance(self.settings.contact_probability_threshold)
    }

    /// The composed contact estimator (forces, probabilities, debounced state)
    pub fn contact_estimator(&self) -> &ContactEstimator {
        &self.contact_estimator
    }

    /// Mutable access for reconfiguration (surface normals, sensor biases)
    pub fn contact_estimator_mut(&mut self) -> &mut ContactEstimator {
        &mut self.contact_estimator
    }

    /// Filtered joint velocities from the current cycle [rad/s]
    pub fn joint_velocity(&self) -> &DVector<f64> {
        self.filters.joint_velocity.output()
    }

    /// Filtered joint accelerations from the current cycle [rad/s²]
    pub fn joint_acceleration(&self) -> &DVector<f64> {
        self.filters.joint_acceleration.output()
    }

    /// Filtered joint torques from the current cycle [N·m]
    pub fn joint_torque(&self) -> &DVector<f64> {
        self.filters.joint_torque.output()
    }

    /// The settings this pipeline was built with
    pub fn settings(&self) -> &StateEstimatorSettings {
        &self.settings
    }

    /// Reset the filter bank and the contact debouncers; the base state and
    /// its covariance are left untouched
    pub fn reset(&mut self) {
        self.filters.reset();
        self.contact_estimator.reset();
    }
}

//! Contact force, probability and covariance estimation
//!
//! For each leg the contact force is reconstructed from the deviation of the
//! measured joint torque from the inverse-dynamics prediction:
//!
//! ```text
//! f_i = -J_i^{-T} (τ_i - τ_id_i)
//! ```
//!
//! The force projected onto the leg's surface normal feeds a logistic
//! contact-probability model, and the sample-to-sample volatility of the
//! normal force drives an adaptive covariance that widens the fusion
//! filter's trust interval during impact transients.

use nalgebra::{DVector, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::robot::Robot;
use crate::signal::{SchmittTrigger, SchmittTriggerSettings};

/// Settings validation errors, fatal at construction time
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings field `{field}` has length {got}, expected {expected} (one per leg)")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("schmitt trigger thresholds must satisfy lower <= higher and non-negative delays")]
    InvalidSchmittThresholds,
}

/// Per-leg sigmoid parameters, sensor biases and hysteresis settings
///
/// Invariant: the per-leg arrays all have length equal to the robot's
/// contact count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEstimatorSettings {
    /// Sigmoid intercept per leg
    pub beta0: Vec<f64>,
    /// Sigmoid slope per leg
    pub beta1: Vec<f64>,
    /// Raw force-sensor bias per leg [N]
    pub force_sensor_bias: Vec<f64>,
    /// Gain of the adaptive covariance on the squared normal-force increment
    pub contact_force_cov_alpha: f64,
    /// Hysteresis settings shared by every per-leg trigger
    pub schmitt_trigger: SchmittTriggerSettings,
}

impl ContactEstimatorSettings {
    /// Check the per-leg array lengths and trigger invariants
    pub fn validate(&self, num_contacts: usize) -> Result<(), SettingsError> {
        let check = |field: &'static str, len: usize| {
            if len == num_contacts {
                Ok(())
            } else {
                Err(SettingsError::DimensionMismatch {
                    field,
                    expected: num_contacts,
                    got: len,
                })
            }
        };
        check("beta0", self.beta0.len())?;
        check("beta1", self.beta1.len())?;
        check("force_sensor_bias", self.force_sensor_bias.len())?;
        if !self.schmitt_trigger.is_valid() {
            return Err(SettingsError::InvalidSchmittThresholds);
        }
        Ok(())
    }
}

/// Per-leg contact estimator
///
/// All per-leg containers are sized once at construction from the robot's
/// contact count and never resized. Zero legs is a valid empty
/// configuration; every operation is then a no-op over an empty set.
#[derive(Debug, Clone)]
pub struct ContactEstimator {
    settings: ContactEstimatorSettings,
    dt: f64,
    force_estimate: Vec<Vector3<f64>>,
    normal_estimate: Vec<f64>,
    normal_estimate_prev: Vec<f64>,
    probability: Vec<f64>,
    covariance: Vec<f64>,
    surface_normal: Vec<Vector3<f64>>,
    triggers: Vec<SchmittTrigger>,
    num_contacts: usize,
}

impl ContactEstimator {
    /// Create an estimator bound to `robot`'s contact count
    ///
    /// Surface normals default to +z (flat ground). Fails if the per-leg
    /// settings arrays do not match the contact count.
    pub fn new<R: Robot>(
        robot: &R,
        settings: ContactEstimatorSettings,
        dt: f64,
    ) -> Result<Self, SettingsError> {
        let n = robot.num_contacts();
        settings.validate(n)?;
        let triggers = (0..n)
            .map(|_| SchmittTrigger::new(settings.schmitt_trigger))
            .collect();
        Ok(Self {
            settings,
            dt,
            force_estimate: vec![Vector3::zeros(); n],
            normal_estimate: vec![0.0; n],
            normal_estimate_prev: vec![0.0; n],
            probability: vec![0.0; n],
            covariance: vec![0.0; n],
            surface_normal: vec![Vector3::z(); n],
            triggers,
            num_contacts: n,
        })
    }

    /// Number of legs tracked by this estimator
    pub fn num_contacts(&self) -> usize {
        self.num_contacts
    }

    /// Run one estimation cycle
    ///
    /// `joint_torques` is the filtered measured torque vector and
    /// `force_sensor_raw` the raw per-leg force-sensor channel (debounced
    /// through the Schmitt triggers after bias removal). Both must follow
    /// the leg-major layout of [`Robot`].
    pub fn update<R: Robot>(
        &mut self,
        robot: &R,
        joint_torques: &DVector<f64>,
        force_sensor_raw: &[f64],
    ) {
        let tau_id = robot.joint_inverse_dynamics();

        // Contact force from the inverse-dynamics torque deviation
        for i in 0..self.num_contacts {
            let jac = robot.joint_contact_jacobian(i);
            let tau_err = joint_torques.fixed_rows::<3>(3 * i) - tau_id.fixed_rows::<3>(3 * i);
            self.force_estimate[i] = match jac.transpose().try_inverse() {
                Some(jt_inv) => -jt_inv * tau_err,
                // Singular block: surface the degenerate estimate as-is,
                // the probability clamp below absorbs it
                None => Vector3::from_element(f64::NAN),
            };
            self.normal_estimate[i] = self.force_estimate[i].dot(&self.surface_normal[i]);
        }

        // Contact probability
        for i in 0..self.num_contacts {
            let p = 1.0
                / (1.0
                    + (-self.settings.beta1[i] * self.normal_estimate[i]
                        - self.settings.beta0[i])
                        .exp());
            self.probability[i] = if p.is_finite() { p } else { 0.0 };
        }

        // Adaptive covariance from normal-force volatility
        for i in 0..self.num_contacts {
            let df = self.normal_estimate[i] - self.normal_estimate_prev[i];
            self.covariance[i] = self.settings.contact_force_cov_alpha * df * df;
            self.normal_estimate_prev[i] = self.normal_estimate[i];
        }

        // Debounced binary state from the bias-corrected force sensor
        for i in 0..self.num_contacts {
            let was_on = self.triggers[i].is_on();
            let on = self.triggers[i].update(
                self.dt,
                force_sensor_raw[i] - self.settings.force_sensor_bias[i],
            );
            if on != was_on {
                log::debug!("leg {i} debounced contact -> {on}");
            }
        }
    }

    /// Threshold each leg's probability into `(leg_index, in_contact)` pairs
    pub fn contact_state(&self, prob_threshold: f64) -> Vec<(usize, bool)> {
        self.probability
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, p >= prob_threshold))
            .collect()
    }

    /// Debounced per-leg contact booleans from the Schmitt triggers
    pub fn debounced_contact_state(&self) -> Vec<bool> {
        self.triggers.iter().map(|t| t.is_on()).collect()
    }

    /// Latest per-leg 3D contact force estimates [N]
    pub fn contact_force_estimate(&self) -> &[Vector3<f64>] {
        &self.force_estimate
    }

    /// Latest per-leg normal force estimates [N]
    pub fn contact_force_normal_estimate(&self) -> &[f64] {
        &self.normal_estimate
    }

    /// Latest per-leg contact probabilities in [0, 1]
    pub fn contact_probability(&self) -> &[f64] {
        &self.probability
    }

    /// Mean adaptive covariance over the legs currently above `prob_threshold`
    ///
    /// Returns 0 when no leg is in contact: no information, and no division
    /// by zero.
    pub fn contact_force_covariance(&self, prob_threshold: f64) -> f64 {
        let num_active = self
            .probability
            .iter()
            .filter(|&&p| p >= prob_threshold)
            .count();
        if num_active == 0 {
            return 0.0;
        }
        self.covariance.iter().sum::<f64>() / num_active as f64
    }

    /// Adaptive covariance of one leg
    pub fn contact_covariance(&self, contact: usize) -> f64 {
        self.covariance[contact]
    }

    /// Per-leg contact surface normals
    pub fn contact_surface_normal(&self) -> &[Vector3<f64>] {
        &self.surface_normal
    }

    /// Replace the per-leg surface normals (e.g. sloped terrain)
    pub fn set_contact_surface_normal(
        &mut self,
        normals: Vec<Vector3<f64>>,
    ) -> Result<(), SettingsError> {
        if normals.len() != self.num_contacts {
            return Err(SettingsError::DimensionMismatch {
                field: "contact_surface_normal",
                expected: self.num_contacts,
                got: normals.len(),
            });
        }
        self.surface_normal = normals;
        Ok(())
    }

    /// Per-leg raw force-sensor biases [N]
    pub fn force_sensor_bias(&self) -> &[f64] {
        &self.settings.force_sensor_bias
    }

    /// Replace the per-leg force-sensor biases
    pub fn set_force_sensor_bias(&mut self, bias: Vec<f64>) -> Result<(), SettingsError> {
        if bias.len() != self.num_contacts {
            return Err(SettingsError::DimensionMismatch {
                field: "force_sensor_bias",
                expected: self.num_contacts,
                got: bias.len(),
            });
        }
        self.settings.force_sensor_bias = bias;
        Ok(())
    }

    /// Reconfigure in place, re-propagating hysteresis settings into every
    /// per-leg trigger
    pub fn set_parameters(&mut self, settings: ContactEstimatorSettings) -> Result<(), SettingsError> {
        settings.validate(self.num_contacts)?;
        for trigger in &mut self.triggers {
            trigger.set_parameters(settings.schmitt_trigger);
        }
        self.settings = settings;
        Ok(())
    }

    /// Reset every per-leg trigger, keeping force and probability history
    pub fn reset(&mut self) {
        for trigger in &mut self.triggers {
            trigger.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    /// Fixture with identity leg Jacobians and configurable inverse dynamics
    struct TestRobot {
        num_contacts: usize,
        jacobians: Vec<Matrix3<f64>>,
        tau_id: DVector<f64>,
    }

    impl TestRobot {
        fn quadruped() -> Self {
            Self {
                num_contacts: 4,
                jacobians: vec![Matrix3::identity(); 4],
                tau_id: DVector::zeros(12),
            }
        }
    }

    impl Robot for TestRobot {
        fn num_contacts(&self) -> usize {
            self.num_contacts
        }

        fn joint_contact_jacobian(&self, contact: usize) -> Matrix3<f64> {
            self.jacobians[contact]
        }

        fn joint_inverse_dynamics(&self) -> &DVector<f64> {
            &self.tau_id
        }

        fn contact_frame_position(&self, _contact: usize) -> Vector3<f64> {
            Vector3::zeros()
        }
    }

    fn settings() -> ContactEstimatorSettings {
        ContactEstimatorSettings {
            beta0: vec![-20.0; 4],
            beta1: vec![0.7; 4],
            force_sensor_bias: vec![0.0; 4],
            contact_force_cov_alpha: 100.0,
            schmitt_trigger: SchmittTriggerSettings::default(),
        }
    }

    #[test]
    fn test_rejects_mismatched_settings() {
        let robot = TestRobot::quadruped();
        let mut bad = settings();
        bad.beta0 = vec![-20.0; 2];
        assert!(ContactEstimator::new(&robot, bad, 0.0025).is_err());
    }

    #[test]
    fn test_zero_legs_is_valid() {
        let robot = TestRobot {
            num_contacts: 0,
            jacobians: vec![],
            tau_id: DVector::zeros(0),
        };
        let empty = ContactEstimatorSettings {
            beta0: vec![],
            beta1: vec![],
            force_sensor_bias: vec![],
            contact_force_cov_alpha: 100.0,
            schmitt_trigger: SchmittTriggerSettings::default(),
        };
        let mut estimator = ContactEstimator::new(&robot, empty, 0.0025).unwrap();
        estimator.update(&robot, &DVector::zeros(0), &[]);
        assert!(estimator.contact_state(0.5).is_empty());
        assert_relative_eq!(estimator.contact_force_covariance(0.5), 0.0);
    }

    #[test]
    fn test_force_reconstruction_identity_jacobian() {
        let robot = TestRobot::quadruped();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        // tau = -J^T f  =>  with J = I, f = -tau
        let mut tau = DVector::zeros(12);
        tau[2] = -30.0; // leg 0, z joint torque
        estimator.update(&robot, &tau, &[0.0; 4]);

        assert_relative_eq!(
            estimator.contact_force_estimate()[0],
            Vector3::new(0.0, 0.0, 30.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(estimator.contact_force_normal_estimate()[0], 30.0);
        // 30 N against beta0 = -20, beta1 = 0.7 gives p = sigmoid(1.0)
        assert_relative_eq!(
            estimator.contact_probability()[0],
            1.0 / (1.0 + (-1.0f64).exp()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_singular_jacobian_clamps_probability() {
        let mut robot = TestRobot::quadruped();
        robot.jacobians[1] = Matrix3::zeros();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        let mut tau = DVector::zeros(12);
        tau[5] = -10.0;
        estimator.update(&robot, &tau, &[0.0; 4]);

        // The degenerate force estimate is surfaced as-is
        assert!(!estimator.contact_force_estimate()[1].x.is_finite());
        // but the probability stays finite and in range
        for &p in estimator.contact_probability() {
            assert!(p.is_finite());
            assert!((0.0..=1.0).contains(&p));
        }
        assert_eq!(estimator.contact_probability()[1], 0.0);
    }

    #[test]
    fn test_covariance_tracks_volatility() {
        let robot = TestRobot::quadruped();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        let mut tau = DVector::zeros(12);
        tau[2] = -10.0;
        estimator.update(&robot, &tau, &[0.0; 4]);
        // First step: df = 10, cov = 100 * 100
        assert_relative_eq!(estimator.contact_covariance(0), 100.0 * 100.0);
        // Held constant: df = 0, cov = 0
        estimator.update(&robot, &tau, &[0.0; 4]);
        assert_relative_eq!(estimator.contact_covariance(0), 0.0);
    }

    #[test]
    fn test_aggregate_covariance_zero_without_contact() {
        let robot = TestRobot::quadruped();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        // Large negative normal force: probability ~ 0 on every leg
        let mut tau = DVector::zeros(12);
        for i in 0..4 {
            tau[3 * i + 2] = 50.0;
        }
        estimator.update(&robot, &tau, &[0.0; 4]);
        assert!(estimator.contact_state(0.5).iter().all(|&(_, c)| !c));
        assert_relative_eq!(estimator.contact_force_covariance(0.5), 0.0);
    }

    #[test]
    fn test_aggregate_covariance_positive_with_contact() {
        let robot = TestRobot::quadruped();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        let mut tau = DVector::zeros(12);
        tau[2] = -60.0;
        estimator.update(&robot, &tau, &[0.0; 4]);
        assert!(estimator.contact_state(0.5)[0].1);
        assert!(estimator.contact_force_covariance(0.5) > 0.0);
    }

    #[test]
    fn test_setters_reject_wrong_length() {
        let robot = TestRobot::quadruped();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        assert!(estimator
            .set_contact_surface_normal(vec![Vector3::z(); 3])
            .is_err());
        assert!(estimator.set_force_sensor_bias(vec![0.0; 5]).is_err());
        // The per-leg containers keep their length
        assert_eq!(estimator.contact_surface_normal().len(), 4);
        assert_eq!(estimator.force_sensor_bias().len(), 4);
    }

    #[test]
    fn test_surface_normal_projection() {
        let robot = TestRobot::quadruped();
        let mut estimator = ContactEstimator::new(&robot, settings(), 0.0025).unwrap();
        let mut normals = vec![Vector3::z(); 4];
        normals[0] = Vector3::x();
        estimator.set_contact_surface_normal(normals).unwrap();

        let mut tau = DVector::zeros(12);
        tau[0] = -25.0; // force along +x on leg 0
        estimator.update(&robot, &tau, &[0.0; 4]);
        assert_relative_eq!(estimator.contact_force_normal_estimate()[0], 25.0);
    }
}

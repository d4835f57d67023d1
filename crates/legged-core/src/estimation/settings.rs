//! Estimator configuration
//!
//! One settings record loaded before the hot loop starts. Named presets are
//! plain constructor functions; no process-wide mutable state.

use serde::{Deserialize, Serialize};

use crate::contact::ContactEstimatorSettings;
use crate::signal::{LowPassCutoffs, SchmittTriggerSettings};

/// Noise standard deviations of the base-state fusion filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Gyroscope white noise [rad/s]
    pub gyro_noise: f64,
    /// Accelerometer white noise [m/s²]
    pub accel_noise: f64,
    /// Gyroscope bias random-walk noise [rad/(s·√s)]
    pub gyro_bias_noise: f64,
    /// Accelerometer bias random-walk noise [m/(s²·√s)]
    pub accel_bias_noise: f64,
    /// Kinematic pseudo-measurement noise of a planted foot [m/s]
    pub contact_noise: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            gyro_noise: 0.01,
            accel_noise: 0.1,
            gyro_bias_noise: 0.00001,
            accel_bias_noise: 0.0001,
            contact_noise: 0.1,
        }
    }
}

/// Full configuration of the state estimation pipeline
///
/// The URDF path and frame ids are carried for the host, which owns the
/// dynamics model; the core never parses the robot description itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEstimatorSettings {
    /// Path to the URDF file
    pub path_to_urdf: String,
    /// Frame id of the IMU
    pub imu_frame: usize,
    /// Frame ids of the contact frames
    pub contact_frames: Vec<usize>,
    /// Contact estimator settings
    pub contact_estimator: ContactEstimatorSettings,
    /// Fusion filter noise parameters
    pub noise_params: NoiseParams,
    /// Probability above which a leg's kinematics correct the base state
    pub contact_probability_threshold: f64,
    /// Estimation time step [s]
    pub dt: f64,
    /// Low-pass cutoff frequencies of the raw sensor channels [Hz]
    pub lpf_cutoffs: LowPassCutoffs,
}

impl StateEstimatorSettings {
    /// Preset for the Unitree A1 quadruped
    pub fn a1(path_to_urdf: impl Into<String>, dt: f64) -> Self {
        Self {
            path_to_urdf: path_to_urdf.into(),
            imu_frame: 46,
            contact_frames: vec![14, 24, 34, 44],
            contact_estimator: ContactEstimatorSettings {
                beta0: vec![-20.0; 4],
                beta1: vec![0.7; 4],
                force_sensor_bias: vec![0.0; 4],
                contact_force_cov_alpha: 100.0,
                schmitt_trigger: SchmittTriggerSettings::default(),
            },
            noise_params: NoiseParams::default(),
            contact_probability_threshold: 0.5,
            dt,
            lpf_cutoffs: LowPassCutoffs {
                gyro: 250.0,
                lin_accel: 250.0,
                joint_velocity: 10.0,
                joint_acceleration: 5.0,
                joint_torque: 10.0,
            },
        }
    }
}

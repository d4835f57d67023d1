//! Base-state fusion and per-cycle orchestration
//!
//! - [`BaseStateEstimator`]: error-state Kalman filter over orientation,
//!   velocity, position and IMU biases
//! - [`StateEstimator`]: the per-cycle pipeline composing filtering, contact
//!   estimation and fusion
//! - [`StateEstimatorSettings`] / [`NoiseParams`]: the configuration surface

pub mod base_estimator;
pub mod settings;
pub mod state_estimator;

pub use base_estimator::*;
pub use settings::*;
pub use state_estimator::*;

//! # Legged Core
//!
//! On-board state estimation for legged robots.
//!
//! The crate fuses IMU measurements, joint encoder/torque readings and leg
//! kinematics into a continuous, bias-compensated estimate of the floating
//! base together with a per-leg contact classification. It runs once per
//! control cycle and is intended to feed a whole-body controller or gait
//! planner.
//!
//! ## Modules
//!
//! - [`math`]: rotation utilities shared by the fusion filter
//! - [`signal`]: low-pass filtering of raw sensor channels and the Schmitt
//!   trigger used for contact debouncing
//! - [`robot`]: the [`robot::Robot`] trait through which rigid-body dynamics
//!   queries (Jacobians, inverse dynamics) are consumed
//! - [`contact`]: per-leg contact force, probability and covariance estimation
//! - [`estimation`]: the error-state Kalman base-state filter and the
//!   per-cycle orchestrator
//!
//! URDF loading, sensor I/O and process wiring live outside this crate; the
//! host loop owns the robot model and delivers one batch of raw samples per
//! cycle.

pub mod math;
pub mod signal;
pub mod robot;
pub mod contact;
pub mod estimation;

// Common type aliases
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// Unit quaternion type for rotations
pub type Quat = UnitQuaternion<f64>;

/// Gravity constant [m/s²]
pub const GRAVITY: f64 = 9.81;

/// Gravity vector in the world frame (ENU convention, z-up)
pub fn gravity_world() -> Vec3 {
    Vec3::new(0.0, 0.0, -GRAVITY)
}

//! Rigid-body dynamics collaborator interface
//!
//! The estimator does not parse robot description files or run forward
//! kinematics itself. The host loop owns a dynamics model (typically
//! URDF-backed), updates it once per cycle with the current joint
//! configuration, and hands it to the estimator through this trait.
//!
//! Every query result is assumed valid for the current cycle's joint
//! configuration; the estimator does not re-validate it.

use nalgebra::{DVector, Matrix3, Vector3};

/// Per-cycle dynamics queries consumed by the estimation pipeline
///
/// Joint-space vectors are laid out leg-major: leg `i` owns the contiguous
/// segment `3*i .. 3*i + 3` of joint velocities and torques.
pub trait Robot {
    /// Number of contact frames (legs)
    fn num_contacts(&self) -> usize;

    /// 3x3 linear block of contact frame `i`'s Jacobian with respect to the
    /// joints of leg `i`, expressed in the base frame
    ///
    /// Must be invertible for the force reconstruction to be meaningful; a
    /// near-singular block (stretched leg) is a known risk and propagates
    /// numeric instability into the force estimate.
    fn joint_contact_jacobian(&self, contact: usize) -> Matrix3<f64>;

    /// Joint torques predicted by inverse dynamics for the current motion,
    /// assuming zero external contact force
    fn joint_inverse_dynamics(&self) -> &DVector<f64>;

    /// Position of contact frame `i` in the base frame
    fn contact_frame_position(&self, contact: usize) -> Vector3<f64>;
}

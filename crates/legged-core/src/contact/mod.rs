//! Per-leg contact estimation
//!
//! Reconstructs contact forces from joint torques and leg Jacobians, maps
//! them to a contact probability, and tracks an adaptive measurement
//! covariance consumed by the base-state fusion filter.

pub mod estimator;

pub use estimator::*;

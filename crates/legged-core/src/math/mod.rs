//! Mathematical utilities shared by the estimation pipeline

pub mod rotation;

pub use rotation::*;

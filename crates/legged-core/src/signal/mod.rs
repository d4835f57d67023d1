//! Raw-signal conditioning
//!
//! Low-pass filters for the raw sensor channels and the Schmitt trigger used
//! to debounce per-leg contact classification.

pub mod low_pass;
pub mod schmitt;

pub use low_pass::*;
pub use schmitt::*;

//! First-order low-pass filtering of raw sensor channels
//!
//! Discrete first-order IIR: `y[k] = y[k-1] + α (x[k] - y[k-1])` with
//! `α = dt / (dt + 1/(2π f_c))`. One filter instance per sensor channel,
//! updated exactly once per control cycle; the cutoff mapping assumes the
//! configured fixed sample period.

use nalgebra::{DVector, Vector3};
use serde::{Deserialize, Serialize};

/// Smoothing gain for a cutoff frequency [Hz] at a fixed sample period [s]
fn smoothing_gain(dt: f64, cutoff: f64) -> f64 {
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff);
    dt / (dt + rc)
}

/// Scalar first-order low-pass filter
///
/// The first sample after construction or [`reset`](LowPassFilter::reset)
/// initializes the history to the input, so there is no start-up transient.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    state: f64,
    initialized: bool,
}

impl LowPassFilter {
    /// Create a filter for the given sample period [s] and cutoff [Hz]
    pub fn new(dt: f64, cutoff: f64) -> Self {
        Self {
            alpha: smoothing_gain(dt, cutoff),
            state: 0.0,
            initialized: false,
        }
    }

    /// Advance the filter by one sample and return the filtered value
    pub fn update(&mut self, raw: f64) -> f64 {
        if !self.initialized {
            self.state = raw;
            self.initialized = true;
        } else {
            self.state += self.alpha * (raw - self.state);
        }
        self.state
    }

    /// Latest filtered value
    pub fn output(&self) -> f64 {
        self.state
    }

    /// Re-seed the filter from the next input
    pub fn reset(&mut self) {
        self.state = 0.0;
        self.initialized = false;
    }
}

/// Low-pass filter over a 3-vector channel (gyro, linear acceleration)
#[derive(Debug, Clone)]
pub struct LowPassFilterVec3 {
    alpha: f64,
    state: Vector3<f64>,
    initialized: bool,
}

impl LowPassFilterVec3 {
    pub fn new(dt: f64, cutoff: f64) -> Self {
        Self {
            alpha: smoothing_gain(dt, cutoff),
            state: Vector3::zeros(),
            initialized: false,
        }
    }

    pub fn update(&mut self, raw: &Vector3<f64>) -> Vector3<f64> {
        if !self.initialized {
            self.state = *raw;
            self.initialized = true;
        } else {
            self.state += self.alpha * (raw - self.state);
        }
        self.state
    }

    pub fn output(&self) -> &Vector3<f64> {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = Vector3::zeros();
        self.initialized = false;
    }
}

/// Low-pass filter over a joint-space vector channel
///
/// Dimension is fixed by the first sample; all later samples must match.
#[derive(Debug, Clone)]
pub struct LowPassFilterVec {
    alpha: f64,
    state: DVector<f64>,
    initialized: bool,
}

impl LowPassFilterVec {
    pub fn new(dt: f64, cutoff: f64, dim: usize) -> Self {
        Self {
            alpha: smoothing_gain(dt, cutoff),
            state: DVector::zeros(dim),
            initialized: false,
        }
    }

    pub fn update(&mut self, raw: &DVector<f64>) -> &DVector<f64> {
        if !self.initialized {
            self.state.copy_from(raw);
            self.initialized = true;
        } else {
            self.state.axpy(self.alpha, raw, 1.0 - self.alpha);
        }
        &self.state
    }

    pub fn output(&self) -> &DVector<f64> {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.fill(0.0);
        self.initialized = false;
    }
}

/// The five filtered channels consumed by the estimation pipeline
///
/// Cutoffs follow the settings record: gyro and linear acceleration from the
/// IMU, joint velocity, joint acceleration and joint torque from the encoder
/// and actuator channels.
#[derive(Debug, Clone)]
pub struct LowPassFilterBank {
    /// Angular rate channel [rad/s]
    pub gyro: LowPassFilterVec3,
    /// Linear acceleration channel [m/s²]
    pub lin_accel: LowPassFilterVec3,
    /// Joint velocity channel [rad/s]
    pub joint_velocity: LowPassFilterVec,
    /// Joint acceleration channel [rad/s²]
    pub joint_acceleration: LowPassFilterVec,
    /// Joint torque channel [N·m]
    pub joint_torque: LowPassFilterVec,
}

/// Cutoff frequencies [Hz] for the filter bank channels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LowPassCutoffs {
    pub gyro: f64,
    pub lin_accel: f64,
    pub joint_velocity: f64,
    pub joint_acceleration: f64,
    pub joint_torque: f64,
}

impl LowPassFilterBank {
    /// Create the bank for a robot with `num_joints` actuated joints
    pub fn new(dt: f64, cutoffs: &LowPassCutoffs, num_joints: usize) -> Self {
        Self {
            gyro: LowPassFilterVec3::new(dt, cutoffs.gyro),
            lin_accel: LowPassFilterVec3::new(dt, cutoffs.lin_accel),
            joint_velocity: LowPassFilterVec::new(dt, cutoffs.joint_velocity, num_joints),
            joint_acceleration: LowPassFilterVec::new(dt, cutoffs.joint_acceleration, num_joints),
            joint_torque: LowPassFilterVec::new(dt, cutoffs.joint_torque, num_joints),
        }
    }

    /// Re-seed every channel from its next input
    pub fn reset(&mut self) {
        self.gyro.reset();
        self.lin_accel.reset();
        self.joint_velocity.reset();
        self.joint_acceleration.reset();
        self.joint_torque.reset();
    }
}

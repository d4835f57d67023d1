//! Schmitt trigger with dwell-time debouncing
//!
//! Turns a noisy scalar signal into a boolean that only flips after the
//! signal has stayed past the arming threshold for a minimum dwell time.
//! One trigger per leg prevents single noisy force samples from toggling the
//! contact classification.

use serde::{Deserialize, Serialize};

/// Thresholds and dwell times for one trigger
///
/// Invariant: `lower_threshold <= higher_threshold`, dwell times
/// non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SchmittTriggerSettings {
    /// Signal level that arms the ON -> OFF transition
    pub lower_threshold: f64,
    /// Signal level that arms the OFF -> ON transition
    pub higher_threshold: f64,
    /// Dwell time [s] below `lower_threshold` before switching OFF
    pub lower_time_delay: f64,
    /// Dwell time [s] above `higher_threshold` before switching ON
    pub higher_time_delay: f64,
}

impl SchmittTriggerSettings {
    /// Check the threshold ordering and dwell-time sign invariants
    pub fn is_valid(&self) -> bool {
        self.lower_threshold <= self.higher_threshold
            && self.lower_time_delay >= 0.0
            && self.higher_time_delay >= 0.0
    }
}

/// Two-state hysteresis machine {OFF, ON}
///
/// OFF -> ON when the input exceeds `higher_threshold` continuously for
/// `higher_time_delay`; ON -> OFF symmetrically with `lower_threshold` and
/// `lower_time_delay`. A candidate transition is abandoned as soon as the
/// signal falls back across its arming threshold.
#[derive(Debug, Clone)]
pub struct SchmittTrigger {
    settings: SchmittTriggerSettings,
    on: bool,
    dwell: f64,
}

impl SchmittTrigger {
    pub fn new(settings: SchmittTriggerSettings) -> Self {
        Self {
            settings,
            on: false,
            dwell: 0.0,
        }
    }

    /// Advance the debounce timer by `dt` with the current signal sample
    ///
    /// Returns the (possibly flipped) output state.
    pub fn update(&mut self, dt: f64, signal: f64) -> bool {
        if self.on {
            if signal < self.settings.lower_threshold {
                self.dwell += dt;
                if self.dwell >= self.settings.lower_time_delay {
                    self.on = false;
                    self.dwell = 0.0;
                }
            } else {
                self.dwell = 0.0;
            }
        } else if signal > self.settings.higher_threshold {
            self.dwell += dt;
            if self.dwell >= self.settings.higher_time_delay {
                self.on = true;
                self.dwell = 0.0;
            }
        } else {
            self.dwell = 0.0;
        }
        self.on
    }

    /// Current debounced output
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Replace the thresholds and dwell times, keeping the current state
    pub fn set_parameters(&mut self, settings: SchmittTriggerSettings) {
        self.settings = settings;
    }

    /// Return to OFF and zero the dwell timer
    pub fn reset(&mut self) {
        self.on = false;
        self.dwell = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SchmittTriggerSettings {
        SchmittTriggerSettings {
            lower_threshold: 5.0,
            higher_threshold: 15.0,
            lower_time_delay: 0.02,
            higher_time_delay: 0.02,
        }
    }

    #[test]
    fn test_starts_off() {
        let trigger = SchmittTrigger::new(settings());
        assert!(!trigger.is_on());
    }

    #[test]
    fn test_sustained_high_switches_on() {
        let mut trigger = SchmittTrigger::new(settings());
        let dt = 0.005;
        for _ in 0..3 {
            assert!(!trigger.update(dt, 20.0));
        }
        // Fourth sample reaches the 20 ms dwell requirement
        assert!(trigger.update(dt, 20.0));
    }

    #[test]
    fn test_transient_high_is_rejected() {
        let mut trigger = SchmittTrigger::new(settings());
        let dt = 0.005;
        trigger.update(dt, 20.0);
        trigger.update(dt, 20.0);
        // Signal reverts below the arming threshold: candidate abandoned
        trigger.update(dt, 10.0);
        trigger.update(dt, 20.0);
        trigger.update(dt, 20.0);
        assert!(!trigger.is_on());
    }

    #[test]
    fn test_sustained_low_switches_off() {
        let mut trigger = SchmittTrigger::new(settings());
        let dt = 0.005;
        for _ in 0..4 {
            trigger.update(dt, 20.0);
        }
        assert!(trigger.is_on());
        for _ in 0..3 {
            assert!(trigger.update(dt, 0.0));
        }
        assert!(!trigger.update(dt, 0.0));
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        let mut trigger = SchmittTrigger::new(settings());
        let dt = 0.005;
        for _ in 0..4 {
            trigger.update(dt, 20.0);
        }
        // Inside the band: neither transition arms
        for _ in 0..100 {
            assert!(trigger.update(dt, 10.0));
        }
    }

    #[test]
    fn test_reset_returns_to_off() {
        let mut trigger = SchmittTrigger::new(settings());
        let dt = 0.005;
        for _ in 0..4 {
            trigger.update(dt, 20.0);
        }
        trigger.reset();
        assert!(!trigger.is_on());
    }

    #[test]
    fn test_zero_delay_flips_immediately() {
        let mut trigger = SchmittTrigger::new(SchmittTriggerSettings {
            lower_threshold: 5.0,
            higher_threshold: 15.0,
            lower_time_delay: 0.0,
            higher_time_delay: 0.0,
        });
        assert!(trigger.update(0.005, 20.0));
        assert!(!trigger.update(0.005, 0.0));
    }
}

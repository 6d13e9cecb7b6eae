//! Exponentially weighted online standardization

use crate::error::{BcpiError, Result};
use serde::{Deserialize, Serialize};

/// Variance below this is treated as zero and yields a zero output
const VARIANCE_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizeConfig {
    /// Effective history of the running statistics, in seconds
    #[serde(default = "default_history_duration")]
    pub history_duration_s: f64,
}

fn default_history_duration() -> f64 {
    2.0
}

impl Default for StandardizeConfig {
    fn default() -> Self {
        Self {
            history_duration_s: default_history_duration(),
        }
    }
}

impl StandardizeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.history_duration_s.is_finite() && self.history_duration_s > 0.0) {
            return Err(BcpiError::Configuration(format!(
                "Standardization history must be a positive duration, got {}",
                self.history_duration_s
            )));
        }
        Ok(())
    }

    /// Smoothing factor for a stream sampled every `gain` seconds
    pub fn alpha(&self, gain: f64) -> f64 {
        1.0 - (-gain / self.history_duration_s).exp()
    }
}

/// Running mean/variance for one channel
#[derive(Debug, Clone)]
pub struct EwmStandardizer {
    alpha: f64,
    mean: f64,
    variance: f64,
    primed: bool,
}

impl EwmStandardizer {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            mean: 0.0,
            variance: 0.0,
            primed: false,
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        if !self.primed {
            self.mean = x;
            self.variance = 0.0;
            self.primed = true;
        } else {
            let diff = x - self.mean;
            let incr = self.alpha * diff;
            self.mean += incr;
            self.variance = (1.0 - self.alpha) * (self.variance + diff * incr);
        }

        if self.variance > VARIANCE_FLOOR {
            (x - self.mean) / self.variance.sqrt()
        } else {
            0.0
        }
    }

    pub fn process_signal<'a>(&mut self, signal: impl IntoIterator<Item = &'a mut f64>) {
        for sample in signal {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.alpha);
    }
}

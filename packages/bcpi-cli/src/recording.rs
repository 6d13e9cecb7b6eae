//! Recorded session files
//!
//! A recording is a JSON document with the acquisition sample rate, the
//! samples of each channel (channel-major) and the trials that were run:
//!
//! ```json
//! {
//!   "sample_rate": 250.0,
//!   "channels": [[0.1, 0.2, ...], [0.3, 0.1, ...]],
//!   "trials": [{"onset_s": 2.0, "duration_s": 4.0, "label": "INJECT_15"}]
//! }
//! ```

use bcpi_rs::TimeSeriesMessage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSpec {
    pub onset_s: f64,
    pub duration_s: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub freqs: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub sample_rate: f64,
    pub channels: Vec<Vec<f64>>,
    #[serde(default)]
    pub trials: Vec<TrialSpec>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read recording '{}': {}", path.display(), e))?;
        let recording: Recording = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse recording '{}': {}", path.display(), e))?;
        recording.validate()?;
        Ok(recording)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(format!("Invalid sample rate {}", self.sample_rate));
        }
        if self.channels.is_empty() {
            return Err("Recording has no channels".to_string());
        }
        let len = self.channels[0].len();
        if let Some(i) = self.channels.iter().position(|ch| ch.len() != len) {
            return Err(format!(
                "Channel {} has {} samples, expected {}",
                i,
                self.channels[i].len(),
                len
            ));
        }
        for (i, trial) in self.trials.iter().enumerate() {
            if !(trial.onset_s.is_finite() && trial.duration_s.is_finite() && trial.duration_s > 0.0)
            {
                return Err(format!(
                    "Trial {} has invalid onset {} / duration {}",
                    i, trial.onset_s, trial.duration_s
                ));
            }
        }
        Ok(())
    }

    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Segment `[start, start + len)` as a `["time", "ch"]` message
    pub fn segment(&self, start: usize, len: usize) -> Result<TimeSeriesMessage, String> {
        let end = (start + len).min(self.num_samples());
        let start = start.min(end);
        let samples = Array2::from_shape_fn((end - start, self.num_channels()), |(t, c)| {
            self.channels[c][start + t]
        });
        TimeSeriesMessage::from_samples(samples, self.sample_rate, start as f64 / self.sample_rate)
            .map_err(|e| e.to_string())
    }
}

//! CCA frequency decoder
//!
//! Scores each candidate frequency by the largest canonical correlation
//! between the signal and a sine/cosine reference set at that frequency and
//! its harmonics, then turns the scores into a posterior with a softmax.
//!
//! The largest canonical correlation is taken as the top singular value of
//! `design · X`, where `X` is the zero-mean time × channel data matrix.

use crate::error::{BcpiError, Result};
use crate::message::{AxisRef, DecodeInput, TimeAxis, TimeSeriesMessage};
use nalgebra::DMatrix;
use ndarray::{ArrayView1, Axis, Slice};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Harmonics beyond the fundamental included in each reference set
    #[serde(default)]
    pub harmonics: usize,

    #[serde(default = "default_time_axis")]
    pub time_axis: AxisRef,

    /// Candidates used when a trial does not carry its own list
    #[serde(default)]
    pub default_freqs: Vec<f64>,

    /// Upper bound on the analysed window in seconds; 0 uses the whole segment
    #[serde(default)]
    pub max_integration_time_s: f64,
}

fn default_time_axis() -> AxisRef {
    AxisRef::Index(0)
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            harmonics: 0,
            time_axis: default_time_axis(),
            default_freqs: Vec::new(),
            max_integration_time_s: 0.0,
        }
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<()> {
        validate_freqs(&self.default_freqs).map_err(BcpiError::Configuration)?;

        let t = self.max_integration_time_s;
        if !(t.is_finite() && t >= 0.0) {
            return Err(BcpiError::Configuration(format!(
                "Maximum integration time must be a non-negative duration, got {}",
                t
            )));
        }

        Ok(())
    }
}

fn validate_freqs(freqs: &[f64]) -> std::result::Result<(), String> {
    match freqs.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
        Some(bad) => Err(format!("Candidate frequency {} is not a positive value", bad)),
        None => Ok(()),
    }
}

/// Posterior distribution over candidate frequencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPosterior {
    pub freqs: Vec<f64>,
    pub probabilities: Vec<f64>,
}

impl FrequencyPosterior {
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Most probable `(frequency, probability)`
    pub fn best(&self) -> Option<(f64, f64)> {
        self.freqs
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn probability_of(&self, freq: f64) -> Option<f64> {
        self.freqs
            .iter()
            .position(|f| (f - freq).abs() < 1e-9)
            .map(|i| self.probabilities[i])
    }
}

/// Stateless decoder apart from the configuration it holds.
///
/// `decode` borrows immutably and `reconfigure` mutably, so a configuration
/// swap can never interleave with a decode on the same instance.
#[derive(Debug, Clone)]
pub struct FrequencyDecoder {
    config: DecodeConfig,
}

impl FrequencyDecoder {
    pub fn new(config: DecodeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Swap in a new configuration; an invalid one leaves the current one active
    pub fn reconfigure(&mut self, config: DecodeConfig) -> Result<()> {
        config.validate()?;
        log::info!(
            "Decoder reconfigured: {} default freqs, {} harmonics, max integration {} s",
            config.default_freqs.len(),
            config.harmonics,
            config.max_integration_time_s
        );
        self.config = config;
        Ok(())
    }

    /// Decode one segment.
    ///
    /// `NoCandidateFrequencies` and `MalformedInput` errors are per-message:
    /// the caller should skip this input and keep going.
    pub fn decode(&self, input: &DecodeInput) -> Result<FrequencyPosterior> {
        let freqs = match input.trigger_freqs() {
            Some(freqs) => {
                validate_freqs(freqs).map_err(|msg| self.skip(BcpiError::MalformedInput(msg)))?;
                freqs.to_vec()
            }
            None => self.config.default_freqs.clone(),
        };

        if freqs.is_empty() {
            return Err(self.skip(BcpiError::NoCandidateFrequencies));
        }

        let signal = input.signal();
        let time = signal
            .time_axis(&self.config.time_axis)
            .map_err(|e| self.skip(e))?;
        if time.len == 0 {
            return Err(self.skip(BcpiError::MalformedInput(
                "Segment has no samples".to_string(),
            )));
        }
        if signal.channel_count(&time) == 0 {
            return Err(self.skip(BcpiError::MalformedInput(
                "Segment has no channels".to_string(),
            )));
        }

        let n_samples = self.integration_samples(&time);
        let window = signal
            .data()
            .slice_axis(Axis(time.index), Slice::from(0..n_samples));
        if window.iter().any(|v| !v.is_finite()) {
            return Err(self.skip(BcpiError::MalformedInput(
                "Segment contains non-finite samples".to_string(),
            )));
        }

        let t = time.relative_times(n_samples);
        let x = zero_mean_matrix(signal, &time, n_samples);

        let harmonics = self.config.harmonics;
        let scores: Vec<f64> = freqs
            .par_iter()
            .map(|&freq| canonical_score(&design_matrix(freq, harmonics, &t), &x))
            .collect();

        log::debug!(
            "Decoded {} samples x {} channels against {:?}: scores {:?}",
            x.nrows(),
            x.ncols(),
            freqs,
            scores
        );

        Ok(FrequencyPosterior {
            freqs,
            probabilities: softmax(&scores),
        })
    }

    /// `floor(max_integration_time_s * fs)` capped at the segment length
    fn integration_samples(&self, time: &TimeAxis) -> usize {
        let max_t = self.config.max_integration_time_s;
        if max_t > 0.0 {
            let limit = (max_t * time.sample_rate()).floor() as usize;
            limit.min(time.len)
        } else {
            time.len
        }
    }

    fn skip(&self, err: BcpiError) -> BcpiError {
        log::warn!("Skipping segment: {}", err);
        err
    }
}

/// Time × channel matrix of the first `n_samples` samples with per-channel mean removed
fn zero_mean_matrix(signal: &TimeSeriesMessage, time: &TimeAxis, n_samples: usize) -> DMatrix<f64> {
    let lanes: Vec<ArrayView1<'_, f64>> = signal.data().lanes(Axis(time.index)).into_iter().collect();
    let mut x = DMatrix::from_fn(n_samples, lanes.len(), |i, j| lanes[j][i]);

    for mut column in x.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }

    x
}

/// Rows are sin/cos at `freq * (h + 1)` for `h` in `0..=harmonics`
pub fn design_matrix(freq: f64, harmonics: usize, t: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(2 * (harmonics + 1), t.len(), |row, i| {
        let w = 2.0 * PI * freq * (row / 2 + 1) as f64 * t[i];
        if row % 2 == 0 {
            w.sin()
        } else {
            w.cos()
        }
    })
}

/// Largest singular value of `design · x`
pub fn canonical_score(design: &DMatrix<f64>, x: &DMatrix<f64>) -> f64 {
    (design * x)
        .singular_values()
        .iter()
        .copied()
        .fold(0.0, f64::max)
}

/// Softmax shifted by the maximum to avoid overflow
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

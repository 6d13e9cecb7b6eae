//! Digital Filter Implementations
//!
//! Causal IIR Butterworth filters built from second-order sections (biquads)
//! for numerical stability. Filter state lives in the sections, so a filter
//! carries its delay line from one streamed segment to the next.

use crate::error::{BcpiError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Band-pass stage configuration
///
/// `order == 0` bypasses filtering. With only `cutoff_hz` set the stage is a
/// low-pass, with only `cuton_hz` a high-pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub order: usize,
    #[serde(default)]
    pub cuton_hz: Option<f64>,
    #[serde(default)]
    pub cutoff_hz: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            order: 0,
            cuton_hz: None,
            cutoff_hz: None,
        }
    }
}

impl FilterConfig {
    pub fn bandpass(order: usize, cuton_hz: f64, cutoff_hz: f64) -> Self {
        Self {
            order,
            cuton_hz: Some(cuton_hz),
            cutoff_hz: Some(cutoff_hz),
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.order == 0 || (self.cuton_hz.is_none() && self.cutoff_hz.is_none())
    }

    /// Checks that do not depend on the sample rate
    pub fn validate(&self) -> Result<()> {
        if self.is_bypass() {
            return Ok(());
        }

        for (name, freq) in [("cuton", self.cuton_hz), ("cutoff", self.cutoff_hz)] {
            if let Some(f) = freq {
                if !(f.is_finite() && f > 0.0) {
                    return Err(BcpiError::Configuration(format!(
                        "Filter {} must be a positive frequency, got {}",
                        name, f
                    )));
                }
            }
        }

        if let (Some(low), Some(high)) = (self.cuton_hz, self.cutoff_hz) {
            if low >= high {
                return Err(BcpiError::Configuration(format!(
                    "Cuton ({} Hz) must be less than cutoff ({} Hz)",
                    low, high
                )));
            }
        }

        Ok(())
    }

    /// Full validation against the rate the filter will run at
    pub fn validate_for_rate(&self, sample_rate: f64) -> Result<()> {
        self.validate()?;
        if self.is_bypass() {
            return Ok(());
        }

        let nyquist = sample_rate / 2.0;
        let highest = self.cutoff_hz.or(self.cuton_hz).unwrap_or_default();
        if highest >= nyquist {
            return Err(BcpiError::Configuration(format!(
                "Filter edge ({} Hz) must be less than Nyquist ({} Hz)",
                highest, nyquist
            )));
        }

        Ok(())
    }
}

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }
}

/// Cascaded second-order sections filter
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        }
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(input, |acc, section| section.process(acc))
    }

    /// Filter samples in place, carrying state across calls
    pub fn process_signal<'a>(&mut self, signal: impl IntoIterator<Item = &'a mut f64>) {
        for sample in signal {
            *sample = self.process(*sample);
        }
    }

    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

/// Butterworth filter designer (bilinear transform with prewarping)
pub struct ButterworthFilter;

impl ButterworthFilter {
    pub fn lowpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let k = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_lowpass(k, order))
    }

    pub fn highpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let k = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_highpass(k, order))
    }

    /// Band-pass as a high-pass at `low` cascaded with a low-pass at `high`
    pub fn bandpass(low: f64, high: f64, sample_rate: f64, order: usize) -> SosFilter {
        let mut sections = Self::design_highpass(Self::prewarp(low, sample_rate), order);
        sections.extend(Self::design_lowpass(Self::prewarp(high, sample_rate), order));
        SosFilter::new(sections)
    }

    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Damping terms 2*sin(theta_k) of the analog prototype's conjugate pole pairs
    fn pole_pair_damping(order: usize) -> impl Iterator<Item = f64> {
        (0..order / 2).map(move |k| {
            let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * order as f64);
            2.0 * theta.sin()
        })
    }

    fn design_lowpass(k: f64, order: usize) -> Vec<BiquadCoeffs> {
        let k2 = k * k;
        let mut sections: Vec<BiquadCoeffs> = Self::pole_pair_damping(order)
            .map(|q| {
                let denom = 1.0 + q * k + k2;
                BiquadCoeffs {
                    b0: k2 / denom,
                    b1: 2.0 * k2 / denom,
                    b2: k2 / denom,
                    a1: 2.0 * (k2 - 1.0) / denom,
                    a2: (1.0 - q * k + k2) / denom,
                }
            })
            .collect();

        // Odd orders keep one real pole
        if order % 2 == 1 {
            let norm = 1.0 / (1.0 + k);
            sections.push(BiquadCoeffs {
                b0: k * norm,
                b1: k * norm,
                b2: 0.0,
                a1: (k - 1.0) * norm,
                a2: 0.0,
            });
        }

        sections
    }

    fn design_highpass(k: f64, order: usize) -> Vec<BiquadCoeffs> {
        let k2 = k * k;
        let mut sections: Vec<BiquadCoeffs> = Self::pole_pair_damping(order)
            .map(|q| {
                let denom = 1.0 + q * k + k2;
                BiquadCoeffs {
                    b0: 1.0 / denom,
                    b1: -2.0 / denom,
                    b2: 1.0 / denom,
                    a1: 2.0 * (k2 - 1.0) / denom,
                    a2: (1.0 - q * k + k2) / denom,
                }
            })
            .collect();

        if order % 2 == 1 {
            let norm = 1.0 / (1.0 + k);
            sections.push(BiquadCoeffs {
                b0: norm,
                b1: -norm,
                b2: 0.0,
                a1: (k - 1.0) * norm,
                a2: 0.0,
            });
        }

        sections
    }
}

/// Create a filter from configuration; `None` means the stage is bypassed
pub fn create_filter(config: &FilterConfig, sample_rate: f64) -> Result<Option<SosFilter>> {
    config.validate_for_rate(sample_rate)?;

    let filter = match (config.cuton_hz, config.cutoff_hz) {
        _ if config.order == 0 => None,
        (Some(low), Some(high)) => Some(ButterworthFilter::bandpass(
            low,
            high,
            sample_rate,
            config.order,
        )),
        (Some(low), None) => Some(ButterworthFilter::highpass(low, sample_rate, config.order)),
        (None, Some(high)) => Some(ButterworthFilter::lowpass(high, sample_rate, config.order)),
        (None, None) => None,
    };

    Ok(filter)
}

//! Streaming message types
//!
//! A `TimeSeriesMessage` is a labeled N-dimensional array. One of its axes is
//! the time axis and carries a `LinearAxis` (seconds per sample and the
//! timestamp of sample 0). Every other axis is treated as a channel dimension.

use crate::error::{BcpiError, Result};
use ndarray::{Array2, ArrayD, ArrayViewD, Axis, Slice};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Reference to an axis, either by name or by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisRef {
    Index(usize),
    Name(String),
}

impl From<&str> for AxisRef {
    fn from(name: &str) -> Self {
        AxisRef::Name(name.to_string())
    }
}

impl From<usize> for AxisRef {
    fn from(index: usize) -> Self {
        AxisRef::Index(index)
    }
}

impl fmt::Display for AxisRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisRef::Index(i) => write!(f, "#{}", i),
            AxisRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Linearly spaced axis metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearAxis {
    /// Seconds per sample
    pub gain: f64,
    /// Timestamp of sample 0
    pub offset: f64,
}

impl LinearAxis {
    pub fn new(gain: f64, offset: f64) -> Self {
        Self { gain, offset }
    }

    pub fn from_rate(sample_rate: f64, offset: f64) -> Self {
        Self {
            gain: 1.0 / sample_rate,
            offset,
        }
    }
}

/// Resolved time axis of a particular message
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub index: usize,
    pub name: String,
    pub gain: f64,
    pub offset: f64,
    pub len: usize,
}

impl TimeAxis {
    pub fn sample_rate(&self) -> f64 {
        1.0 / self.gain
    }

    /// Sample times relative to the axis offset
    pub fn relative_times(&self, count: usize) -> Vec<f64> {
        (0..count.min(self.len))
            .map(|i| i as f64 * self.gain)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesMessage {
    data: ArrayD<f64>,
    dims: Vec<String>,
    axes: HashMap<String, LinearAxis>,
}

impl TimeSeriesMessage {
    pub fn new(
        data: ArrayD<f64>,
        dims: Vec<String>,
        axes: HashMap<String, LinearAxis>,
    ) -> Result<Self> {
        if dims.len() != data.ndim() {
            return Err(BcpiError::MalformedInput(format!(
                "{} axis names given for a {}-dimensional array",
                dims.len(),
                data.ndim()
            )));
        }

        let mut seen = HashSet::with_capacity(dims.len());
        for dim in &dims {
            if !seen.insert(dim.as_str()) {
                return Err(BcpiError::MalformedInput(format!(
                    "Duplicate axis name '{}'",
                    dim
                )));
            }
        }

        if let Some(stray) = axes.keys().find(|name| !seen.contains(name.as_str())) {
            return Err(BcpiError::MalformedInput(format!(
                "Axis metadata for '{}' which is not a dimension",
                stray
            )));
        }

        Ok(Self { data, dims, axes })
    }

    /// Build a `["time", "ch"]` message from a time × channel matrix
    pub fn from_samples(samples: Array2<f64>, sample_rate: f64, offset: f64) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(BcpiError::MalformedInput(format!(
                "Sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let mut axes = HashMap::new();
        axes.insert("time".to_string(), LinearAxis::from_rate(sample_rate, offset));

        Self::new(
            samples.into_dyn(),
            vec!["time".to_string(), "ch".to_string()],
            axes,
        )
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn axis(&self, name: &str) -> Option<&LinearAxis> {
        self.axes.get(name)
    }

    pub fn into_parts(self) -> (ArrayD<f64>, Vec<String>, HashMap<String, LinearAxis>) {
        (self.data, self.dims, self.axes)
    }

    /// Resolve the time axis, checking that it carries a usable sample period
    pub fn time_axis(&self, axis: &AxisRef) -> Result<TimeAxis> {
        let index = match axis {
            AxisRef::Index(i) if *i < self.dims.len() => *i,
            AxisRef::Name(name) => self
                .dims
                .iter()
                .position(|d| d == name)
                .ok_or_else(|| {
                    BcpiError::MalformedInput(format!("Time axis {} not found", axis))
                })?,
            AxisRef::Index(_) => {
                return Err(BcpiError::MalformedInput(format!(
                    "Time axis {} out of range for {} dimensions",
                    axis,
                    self.dims.len()
                )))
            }
        };

        let name = &self.dims[index];
        let linear = self.axes.get(name).ok_or_else(|| {
            BcpiError::MalformedInput(format!("Axis '{}' carries no sample period", name))
        })?;

        if !(linear.gain.is_finite() && linear.gain > 0.0) {
            return Err(BcpiError::MalformedInput(format!(
                "Axis '{}' has invalid gain {}",
                name, linear.gain
            )));
        }

        Ok(TimeAxis {
            index,
            name: name.clone(),
            gain: linear.gain,
            offset: linear.offset,
            len: self.data.len_of(Axis(index)),
        })
    }

    /// Number of independent channels (product of all non-time extents)
    pub fn channel_count(&self, time: &TimeAxis) -> usize {
        self.data
            .shape()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time.index)
            .map(|(_, n)| *n)
            .product()
    }

    /// Clip `len` samples starting at `start` along the time axis
    pub fn slice_time(&self, axis: &AxisRef, start: usize, len: usize) -> Result<Self> {
        let time = self.time_axis(axis)?;
        let end = start.checked_add(len).filter(|end| *end <= time.len).ok_or_else(|| {
            BcpiError::MalformedInput(format!(
                "Clip {}..{} exceeds {} samples",
                start,
                start.saturating_add(len),
                time.len
            ))
        })?;

        let data = self
            .data
            .slice_axis(Axis(time.index), Slice::from(start..end))
            .to_owned();

        let mut axes = self.axes.clone();
        axes.insert(
            time.name.clone(),
            LinearAxis::new(time.gain, time.offset + start as f64 * time.gain),
        );

        Ok(Self {
            data,
            dims: self.dims.clone(),
            axes,
        })
    }

    /// Join consecutive segments along the time axis.
    ///
    /// Non-empty segments must follow each other without a gap or overlap of
    /// half a sample or more. Metadata comes from the first segment.
    pub fn concat_time(messages: &[TimeSeriesMessage], axis: &AxisRef) -> Result<Self> {
        let first = messages
            .first()
            .ok_or_else(|| BcpiError::MalformedInput("Nothing to concatenate".to_string()))?;
        let time = first.time_axis(axis)?;
        let mut next_offset = (time.len > 0).then(|| time.offset + time.len as f64 * time.gain);

        for msg in &messages[1..] {
            if msg.dims != first.dims {
                return Err(BcpiError::MalformedInput(
                    "Segments have different axis names".to_string(),
                ));
            }
            let other = msg.time_axis(axis)?;
            if (other.gain - time.gain).abs() > f64::EPSILON * time.gain.max(1.0) {
                return Err(BcpiError::MalformedInput(format!(
                    "Segments have different sample periods ({} vs {})",
                    time.gain, other.gain
                )));
            }
            if other.len == 0 {
                continue;
            }
            if let Some(expected) = next_offset {
                if (other.offset - expected).abs() >= 0.5 * time.gain {
                    return Err(BcpiError::MalformedInput(format!(
                        "Segment starting at {} s does not follow the previous one (expected {} s)",
                        other.offset, expected
                    )));
                }
            }
            next_offset = Some(other.offset + other.len as f64 * time.gain);
        }

        let views: Vec<ArrayViewD<'_, f64>> = messages.iter().map(|m| m.data.view()).collect();
        let data = ndarray::concatenate(Axis(time.index), &views)
            .map_err(|e| BcpiError::MalformedInput(format!("Cannot concatenate: {}", e)))?;

        Ok(Self {
            data,
            dims: first.dims.clone(),
            axes: first.axes.clone(),
        })
    }
}

/// Trial-scoped metadata attached by the trial clipper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialTrigger {
    pub timestamp: f64,
    #[serde(default)]
    pub label: Option<String>,
    /// Frequencies (Hz) relevant to this trial
    #[serde(default)]
    pub freqs: Option<Vec<f64>>,
}

/// A clipped trial: the signal segment plus its trigger
#[derive(Debug, Clone, PartialEq)]
pub struct TrialMessage {
    sample: TimeSeriesMessage,
    trigger: TrialTrigger,
}

impl TrialMessage {
    pub fn new(sample: TimeSeriesMessage, trigger: TrialTrigger) -> Self {
        Self { sample, trigger }
    }

    pub fn sample(&self) -> &TimeSeriesMessage {
        &self.sample
    }

    pub fn trigger(&self) -> &TrialTrigger {
        &self.trigger
    }
}

/// Input accepted by the frequency decoder
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeInput {
    Signal(TimeSeriesMessage),
    Trial(TrialMessage),
}

impl DecodeInput {
    pub fn signal(&self) -> &TimeSeriesMessage {
        match self {
            DecodeInput::Signal(msg) => msg,
            DecodeInput::Trial(trial) => trial.sample(),
        }
    }

    /// Non-empty frequency list carried by a trial trigger, if any
    pub fn trigger_freqs(&self) -> Option<&[f64]> {
        match self {
            DecodeInput::Trial(trial) => trial
                .trigger()
                .freqs
                .as_deref()
                .filter(|freqs| !freqs.is_empty()),
            DecodeInput::Signal(_) => None,
        }
    }
}

impl From<TimeSeriesMessage> for DecodeInput {
    fn from(msg: TimeSeriesMessage) -> Self {
        DecodeInput::Signal(msg)
    }
}

impl From<TrialMessage> for DecodeInput {
    fn from(trial: TrialMessage) -> Self {
        DecodeInput::Trial(trial)
    }
}

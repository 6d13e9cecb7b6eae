//! Signal Conditioner
//!
//! Streaming preprocessing chain applied to raw multi-channel segments:
//! 1. Decimation (integer factor)
//! 2. Butterworth band-pass, designed at the post-decimation rate
//! 3. Exponentially weighted standardization
//!
//! The decimation phase, filter delay lines and EWM accumulators are carried
//! across segments, so segment boundaries do not affect the output. State is
//! rebuilt whenever the input sample period or channel count changes.

use super::decimate::{DecimateConfig, Decimator};
use super::ewm::{EwmStandardizer, StandardizeConfig};
use super::filters::{create_filter, FilterConfig, SosFilter};
use crate::error::{BcpiError, Result};
use crate::message::{AxisRef, LinearAxis, TimeSeriesMessage};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Configuration for the preprocessing chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocConfig {
    #[serde(default = "default_time_axis")]
    pub time_axis: AxisRef,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub decimate: DecimateConfig,

    #[serde(default)]
    pub standardize: StandardizeConfig,
}

fn default_time_axis() -> AxisRef {
    AxisRef::from("time")
}

impl Default for PreprocConfig {
    fn default() -> Self {
        Self {
            time_axis: default_time_axis(),
            filter: FilterConfig::default(),
            decimate: DecimateConfig::default(),
            standardize: StandardizeConfig::default(),
        }
    }
}

impl PreprocConfig {
    /// Settings used on the headset: 3rd order 5-50 Hz band, halved rate, 2 s history
    pub fn standard_ssvep() -> Self {
        Self {
            filter: FilterConfig::bandpass(3, 5.0, 50.0),
            decimate: DecimateConfig { factor: 2 },
            standardize: StandardizeConfig {
                history_duration_s: 2.0,
            },
            ..Default::default()
        }
    }

    /// Validate the configuration, including the filter band when the input rate is known
    pub fn validate(&self, input_rate: Option<f64>) -> Result<()> {
        self.decimate.validate()?;
        self.standardize.validate()?;
        self.filter.validate()?;

        if let Some(rate) = input_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(BcpiError::Configuration(format!(
                    "Input sample rate must be positive, got {}",
                    rate
                )));
            }
            self.filter
                .validate_for_rate(rate / self.decimate.factor as f64)?;
        }

        Ok(())
    }
}

/// Per-channel streaming state
#[derive(Debug, Clone)]
struct LaneState {
    filter: Option<SosFilter>,
    ewm: EwmStandardizer,
}

#[derive(Debug)]
struct StreamState {
    input_gain: f64,
    decimator: Decimator,
    lanes: Vec<LaneState>,
}

impl StreamState {
    fn matches(&self, gain: f64, n_lanes: usize) -> bool {
        self.lanes.len() == n_lanes && (self.input_gain - gain).abs() <= 1e-12 * gain
    }
}

#[derive(Debug)]
enum ConditionerState {
    Idle,
    Streaming(StreamState),
    Failed(String),
}

/// Preprocessing chain that maintains filter and EWM state across segments
#[derive(Debug)]
pub struct SignalConditioner {
    config: PreprocConfig,
    state: ConditionerState,
}

impl SignalConditioner {
    pub fn new(config: PreprocConfig) -> Result<Self> {
        config.validate(None)?;
        Ok(Self {
            config,
            state: ConditionerState::Idle,
        })
    }

    pub fn config(&self) -> &PreprocConfig {
        &self.config
    }

    /// True once a fatal error has stopped the conditioner
    pub fn is_halted(&self) -> bool {
        matches!(self.state, ConditionerState::Failed(_))
    }

    /// Replace the configuration, discarding all stream state.
    ///
    /// An invalid configuration is rejected and the current one stays active.
    pub fn reconfigure(&mut self, config: PreprocConfig) -> Result<()> {
        config.validate(None)?;
        log::info!("Preprocessing reconfigured: {:?}", config);
        self.config = config;
        self.state = ConditionerState::Idle;
        Ok(())
    }

    /// Drop decimation, filter and EWM state (and any halt), keeping the configuration
    pub fn reset(&mut self) {
        self.state = ConditionerState::Idle;
    }

    /// Condition one raw segment
    pub fn process(&mut self, raw: TimeSeriesMessage) -> Result<TimeSeriesMessage> {
        if let ConditionerState::Failed(reason) = &self.state {
            return Err(BcpiError::Halted(reason.clone()));
        }

        let time = match raw.time_axis(&self.config.time_axis) {
            Ok(time) => time,
            Err(e) => return Err(self.fail(e)),
        };
        let n_lanes = raw.channel_count(&time);

        // Empty segments only update the axis metadata
        if time.len > 0 {
            if let Err(e) = self.ensure_stream(time.gain, n_lanes) {
                return Err(self.fail(e));
            }
        }

        let factor = self.config.decimate.factor;
        let (data, dims, mut axes) = raw.into_parts();

        let (data, first_kept) = match &mut self.state {
            ConditionerState::Streaming(stream) => {
                let first_kept = stream.decimator.first_kept();
                let mut data = stream.decimator.process(&data, time.index);
                for (mut lane, lane_state) in data
                    .lanes_mut(Axis(time.index))
                    .into_iter()
                    .zip(stream.lanes.iter_mut())
                {
                    if let Some(filter) = lane_state.filter.as_mut() {
                        filter.process_signal(lane.iter_mut());
                    }
                    lane_state.ewm.process_signal(lane.iter_mut());
                }
                (data, first_kept)
            }
            // Only empty segments get here
            _ => (data, factor - 1),
        };

        // Output sample 0 is the first input sample the decimator kept
        axes.insert(
            time.name.clone(),
            LinearAxis::new(
                time.gain * factor as f64,
                time.offset + first_kept as f64 * time.gain,
            ),
        );

        TimeSeriesMessage::new(data, dims, axes)
    }

    /// Build per-channel state for the current input geometry if it changed
    fn ensure_stream(&mut self, input_gain: f64, n_lanes: usize) -> Result<()> {
        if let ConditionerState::Streaming(stream) = &self.state {
            if stream.matches(input_gain, n_lanes) {
                return Ok(());
            }
            log::info!(
                "Input geometry changed ({} channels @ {} s -> {} channels @ {} s), resetting state",
                stream.lanes.len(),
                stream.input_gain,
                n_lanes,
                input_gain
            );
        }

        let output_gain = input_gain * self.config.decimate.factor as f64;
        let filter = create_filter(&self.config.filter, 1.0 / output_gain)?;
        let alpha = self.config.standardize.alpha(output_gain);

        log::debug!(
            "Designed conditioner for {} channels at {:.3} Hz ({} filter sections, alpha {:.6})",
            n_lanes,
            1.0 / output_gain,
            filter.as_ref().map_or(0, SosFilter::num_sections),
            alpha
        );

        let lanes = (0..n_lanes)
            .map(|_| LaneState {
                filter: filter.clone(),
                ewm: EwmStandardizer::new(alpha),
            })
            .collect();

        self.state = ConditionerState::Streaming(StreamState {
            input_gain,
            decimator: Decimator::new(self.config.decimate.factor),
            lanes,
        });
        Ok(())
    }

    fn fail(&mut self, err: BcpiError) -> BcpiError {
        let reason = err.to_string();
        log::error!("Signal conditioner stopped: {}", reason);
        self.state = ConditionerState::Failed(reason.clone());
        BcpiError::Configuration(reason)
    }
}

//! Signal Processing Module
//!
//! Streaming conditioning for multi-channel biosignals:
//! - Integer-factor decimation
//! - Butterworth band-pass filtering (second-order sections)
//! - Exponentially weighted standardization
//!
//! Stages run in that order inside [`SignalConditioner`].

mod conditioner;
mod decimate;
mod ewm;
mod filters;

pub use conditioner::{PreprocConfig, SignalConditioner};
pub use decimate::{DecimateConfig, Decimator};
pub use ewm::{EwmStandardizer, StandardizeConfig};
pub use filters::{
    create_filter, BiquadCoeffs, BiquadFilter, ButterworthFilter, FilterConfig, SosFilter,
};

pub mod config;
pub mod decoder;
pub mod error;
pub mod mapper;
pub mod message;
pub mod pipeline;
pub mod signal_processing;
pub mod stim;

pub use config::{BcpiConfig, CONFIG_ENV};
pub use decoder::{DecodeConfig, FrequencyDecoder, FrequencyPosterior};
pub use error::{BcpiError, Result};
pub use mapper::FrequencyMapper;
pub use message::{
    AxisRef, DecodeInput, LinearAxis, TimeAxis, TimeSeriesMessage, TrialMessage, TrialTrigger,
};
pub use pipeline::DecodePipeline;
pub use signal_processing::{PreprocConfig, SignalConditioner};
pub use stim::StimMessage;

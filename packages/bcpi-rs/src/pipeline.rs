//! Conditioner and decoder composed for a continuous stream

use crate::decoder::{DecodeConfig, FrequencyDecoder, FrequencyPosterior};
use crate::error::Result;
use crate::message::{DecodeInput, TimeSeriesMessage};
use crate::signal_processing::{PreprocConfig, SignalConditioner};

/// raw segment -> conditioned segment -> posterior
#[derive(Debug)]
pub struct DecodePipeline {
    conditioner: SignalConditioner,
    decoder: FrequencyDecoder,
}

impl DecodePipeline {
    pub fn new(preproc: PreprocConfig, decode: DecodeConfig) -> Result<Self> {
        Ok(Self {
            conditioner: SignalConditioner::new(preproc)?,
            decoder: FrequencyDecoder::new(decode)?,
        })
    }

    pub fn conditioner(&self) -> &SignalConditioner {
        &self.conditioner
    }

    pub fn decoder(&self) -> &FrequencyDecoder {
        &self.decoder
    }

    pub fn reconfigure_preproc(&mut self, config: PreprocConfig) -> Result<()> {
        self.conditioner.reconfigure(config)
    }

    pub fn reconfigure_decoder(&mut self, config: DecodeConfig) -> Result<()> {
        self.decoder.reconfigure(config)
    }

    /// Condition and decode one raw segment.
    ///
    /// Recoverable decode conditions yield `Ok(None)`; conditioner failures
    /// are returned as errors.
    pub fn process(&mut self, raw: TimeSeriesMessage) -> Result<Option<FrequencyPosterior>> {
        let conditioned = self.conditioner.process(raw)?;
        match self.decoder.decode(&DecodeInput::Signal(conditioned)) {
            Ok(posterior) => Ok(Some(posterior)),
            Err(e) if e.is_recoverable() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BcpiError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("No candidate frequencies to test")]
    NoCandidateFrequencies,

    #[error("Component halted after fatal error: {0}")]
    Halted(String),

    #[error("Stimulation value {0} does not fit in 16 bits")]
    StimValueOutOfRange(u64),

    #[error("Stimulation payload must be exactly 2 bytes, got {0}")]
    StimPayloadLength(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config discovery failed: {0}")]
    Glob(String),
}

impl BcpiError {
    /// Per-message conditions that skip a single input without stopping the stream.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BcpiError::NoCandidateFrequencies | BcpiError::MalformedInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BcpiError>;

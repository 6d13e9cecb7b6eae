use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bcpi",
    version,
    about = "SSVEP frequency decoding command-line tool",
    long_about = "Run recorded EEG through the BCPI conditioning and CCA decoding pipeline.\n\
                  Configuration is read from --config, $BCPI_CONFIG, or the user config directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Condition a recording and decode its trials
    Decode(DecodeArgs),
    /// Load and validate a configuration file
    Validate(ValidateArgs),
    /// Encode or decode a stimulation control value
    Stim(StimArgs),
}

#[derive(Args)]
pub struct DecodeArgs {
    /// Recording JSON file ({sample_rate, channels, trials})
    #[arg(long)]
    pub recording: String,

    /// Configuration file (JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Candidate frequencies in Hz (overrides the configured defaults)
    #[arg(long, num_args = 1..)]
    pub freqs: Vec<f64>,

    /// Harmonics beyond the fundamental
    #[arg(long)]
    pub harmonics: Option<usize>,

    /// Maximum integration time in seconds (0 = whole clip)
    #[arg(long)]
    pub max_int_time: Option<f64>,

    /// Samples per streamed segment
    #[arg(long)]
    pub chunk_samples: Option<usize>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file (JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Print the effective configuration as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct StimArgs {
    #[command(subcommand)]
    pub action: StimAction,
}

#[derive(Subcommand)]
pub enum StimAction {
    /// Encode a value (0-65535) as two big-endian bytes, printed as hex
    Encode { value: u64 },
    /// Decode a 2-byte hex payload (e.g. "face" or "0xFACE")
    Decode { hex: String },
}

/// Parse a hex string into bytes, accepting an optional "0x" prefix.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    if digits.len() % 2 != 0 {
        return Err(format!("Hex payload '{}' has an odd number of digits", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex payload '{}'", s))
        })
        .collect()
}

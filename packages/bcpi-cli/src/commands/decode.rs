use crate::cli::DecodeArgs;
use crate::exit_codes;
use crate::output;
use crate::recording::{Recording, TrialSpec};
use bcpi_rs::{
    AxisRef, BcpiConfig, BcpiError, DecodeInput, FrequencyDecoder, SignalConditioner,
    TimeSeriesMessage, TrialMessage, TrialTrigger,
};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TrialResult {
    index: usize,
    timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decoded_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_freq: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_probability: Option<f64>,
    freqs: Vec<f64>,
    probabilities: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<String>,
}

#[derive(Debug, Serialize)]
struct DecodeReport {
    recording: String,
    input_sample_rate: f64,
    conditioned_sample_rate: f64,
    conditioned_samples: usize,
    num_channels: usize,
    results: Vec<TrialResult>,
}

pub fn execute(args: DecodeArgs) -> i32 {
    let mut config = match BcpiConfig::load(args.config.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load configuration: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    if !args.freqs.is_empty() {
        config.decode.default_freqs = args.freqs.clone();
    }
    if let Some(harmonics) = args.harmonics {
        config.decode.harmonics = harmonics;
    }
    if let Some(max_int_time) = args.max_int_time {
        config.decode.max_integration_time_s = max_int_time;
    }
    if let Some(chunk_samples) = args.chunk_samples {
        config.chunk_samples = chunk_samples;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return exit_codes::CONFIG_ERROR;
    }

    let recording = match Recording::load(Path::new(&args.recording)) {
        Ok(recording) => recording,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Err(e) = config.preproc.validate(Some(recording.sample_rate)) {
        eprintln!("Error: {}", e);
        return exit_codes::CONFIG_ERROR;
    }

    if !args.quiet {
        eprintln!(
            "Decoding {} ({} channels, {} samples @ {} Hz)",
            args.recording,
            recording.num_channels(),
            recording.num_samples(),
            recording.sample_rate
        );
    }

    let stream = match condition(&config, &recording) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: Conditioning failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let time_axis = config.preproc.time_axis.clone();
    let time = match stream.time_axis(&time_axis) {
        Ok(time) => time,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let decoder = match FrequencyDecoder::new(config.decode.clone()) {
        Ok(decoder) => decoder,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };

    let inputs: Vec<(Option<String>, Result<DecodeInput, BcpiError>)> =
        if recording.trials.is_empty() {
            vec![(None, Ok(DecodeInput::Signal(stream.clone())))]
        } else {
            recording
                .trials
                .iter()
                .map(|trial| {
                    (
                        trial.label.clone(),
                        clip_trial(&stream, &time_axis, trial).map(DecodeInput::from),
                    )
                })
                .collect()
        };

    let mut results = Vec::with_capacity(inputs.len());
    for (index, (label, input)) in inputs.into_iter().enumerate() {
        let timestamp = input
            .as_ref()
            .ok()
            .and_then(|input| input.signal().time_axis(&time_axis).ok())
            .map_or(time.offset, |t| t.offset);

        let mut result = TrialResult {
            index,
            timestamp,
            label,
            decoded_label: None,
            best_freq: None,
            best_probability: None,
            freqs: Vec::new(),
            probabilities: Vec::new(),
            skipped: None,
        };

        match input.and_then(|input| decoder.decode(&input)) {
            Ok(posterior) => {
                if let Some((freq, prob)) = posterior.best() {
                    result.best_freq = Some(freq);
                    result.best_probability = Some(prob);
                }
                result.decoded_label = config
                    .mapping
                    .label_for_posterior(&posterior)
                    .map(str::to_string);
                result.freqs = posterior.freqs;
                result.probabilities = posterior.probabilities;
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("Trial {} skipped: {}", index, e);
                result.skipped = Some(e.to_string());
            }
            Err(e) => {
                eprintln!("Error: Trial {}: {}", index, e);
                return exit_codes::EXECUTION_ERROR;
            }
        }

        if !args.quiet {
            match (&result.best_freq, &result.skipped) {
                (Some(freq), _) => eprintln!(
                    "  trial {}: {} Hz (p = {:.3})",
                    index,
                    freq,
                    result.best_probability.unwrap_or_default()
                ),
                (None, Some(reason)) => eprintln!("  trial {}: skipped ({})", index, reason),
                (None, None) => {}
            }
        }
        results.push(result);
    }

    let report = DecodeReport {
        recording: args.recording.clone(),
        input_sample_rate: recording.sample_rate,
        conditioned_sample_rate: time.sample_rate(),
        conditioned_samples: time.len,
        num_channels: stream.channel_count(&time),
        results,
    };

    let destination = output::Destination::from_arg(args.output.as_deref());
    output::emit(&report, args.compact, &destination)
}

/// Stream the recording through the conditioner in acquisition-sized segments
fn condition(config: &BcpiConfig, recording: &Recording) -> Result<TimeSeriesMessage, BcpiError> {
    let mut conditioner = SignalConditioner::new(config.preproc.clone())?;
    let chunk = config.chunk_samples.max(1);

    let mut segments = Vec::with_capacity(recording.num_samples() / chunk + 1);
    for start in (0..recording.num_samples()).step_by(chunk) {
        let raw = recording
            .segment(start, chunk)
            .map_err(BcpiError::MalformedInput)?;
        segments.push(conditioner.process(raw)?);
    }
    if segments.is_empty() {
        return Err(BcpiError::MalformedInput(
            "Recording has no samples".to_string(),
        ));
    }
    log::debug!("Conditioned {} segments", segments.len());

    TimeSeriesMessage::concat_time(&segments, &config.preproc.time_axis)
}

/// Cut `duration` seconds out of the conditioned stream, starting at the
/// first conditioned sample at or after the onset
fn clip_trial(
    stream: &TimeSeriesMessage,
    time_axis: &AxisRef,
    trial: &TrialSpec,
) -> Result<TrialMessage, BcpiError> {
    let time = stream.time_axis(time_axis)?;
    let start = ((trial.onset_s - time.offset) / time.gain - 1e-9).ceil();
    if start < 0.0 || start as usize >= time.len {
        return Err(BcpiError::MalformedInput(format!(
            "Trial onset {} s is outside the recording",
            trial.onset_s
        )));
    }
    let start = start as usize;
    let len = ((trial.duration_s / time.gain + 1e-9).floor() as usize).min(time.len - start);

    let sample = stream.slice_time(time_axis, start, len)?;
    let trigger = TrialTrigger {
        timestamp: trial.onset_s,
        label: trial.label.clone(),
        freqs: trial.freqs.clone(),
    };
    Ok(TrialMessage::new(sample, trigger))
}

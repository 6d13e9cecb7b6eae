use assert_cmd::Command;
use predicates::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

fn bcpi() -> Command {
    Command::cargo_bin("bcpi").unwrap()
}

const FS: f64 = 250.0;

/// Two channels of a 15 Hz response with a DC offset and two off-target tones
fn write_recording(dir: &Path, trials: serde_json::Value) -> PathBuf {
    let n = (8.0 * FS) as usize;
    let channels: Vec<Vec<f64>> = (0..2)
        .map(|c| {
            (0..n)
                .map(|i| {
                    let t = i as f64 / FS;
                    let phase = c as f64 * 0.7;
                    10.0 + 2.0 * (2.0 * PI * 15.0 * t + phase).sin()
                        + 0.3 * (2.0 * PI * 41.3 * t).sin()
                        + 0.2 * (2.0 * PI * 7.7 * t + c as f64).cos()
                })
                .collect()
        })
        .collect();

    let path = dir.join("recording.json");
    let doc = serde_json::json!({
        "sample_rate": FS,
        "channels": channels,
        "trials": trials,
    });
    std::fs::write(&path, doc.to_string()).unwrap();
    path
}

fn no_config(dir: &Path) -> String {
    dir.join("absent.json").to_string_lossy().into_owned()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    bcpi()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    bcpi()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bcpi"));
}

#[test]
fn test_help_lists_subcommands() {
    bcpi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("stim"));
}

// =============================================================================
// STIM SUBCOMMAND
// =============================================================================

#[test]
fn test_stim_encode() {
    bcpi()
        .args(["stim", "encode", "64206"])
        .assert()
        .success()
        .stdout(predicate::str::diff("face\n"));
}

#[test]
fn test_stim_decode() {
    bcpi()
        .args(["stim", "decode", "0xFACE"])
        .assert()
        .success()
        .stdout(predicate::str::diff("64206\n"));
}

#[test]
fn test_stim_encode_out_of_range() {
    bcpi()
        .args(["stim", "encode", "65536"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_stim_decode_wrong_length() {
    bcpi().args(["stim", "decode", "fa"]).assert().code(2);
    bcpi().args(["stim", "decode", "00face"]).assert().code(2);
}

// =============================================================================
// VALIDATE SUBCOMMAND
// =============================================================================

#[test]
fn test_validate_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = bcpi()
        .args(["validate", "--json", "--config", &no_config(dir.path())])
        .assert()
        .success();

    let config = stdout_json(output.get_output());
    assert_eq!(config["chunk_samples"], 50);
    assert_eq!(config["preproc"]["decimate"]["factor"], 2);
    assert_eq!(config["mapping"]["INJECT_15"], 15.0);
}

#[test]
fn test_validate_reports_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"decode": {"harmonics": 2, "default_freqs": [8.0]}}"#).unwrap();

    bcpi()
        .args(["validate", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("2 harmonics"));
}

#[test]
fn test_validate_rejects_inverted_band() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"preproc": {"filter": {"order": 3, "cuton_hz": 30.0, "cutoff_hz": 10.0}}}"#,
    )
    .unwrap();

    bcpi()
        .args(["validate", "--config", path.to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_validate_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ nope").unwrap();

    bcpi()
        .args(["validate", "--config", path.to_str().unwrap()])
        .assert()
        .code(3);
}

// =============================================================================
// DECODE SUBCOMMAND
// =============================================================================

#[test]
fn test_decode_trials() {
    let dir = tempfile::tempdir().unwrap();
    let recording = write_recording(
        dir.path(),
        serde_json::json!([
            {"onset_s": 2.0, "duration_s": 4.0, "label": "INJECT_15"},
            {"onset_s": 2.0, "duration_s": 4.0, "freqs": [12.0, 17.0]},
            {"onset_s": 100.0, "duration_s": 4.0},
        ]),
    );

    let output = bcpi()
        .args(["decode", "--quiet", "--compact"])
        .args(["--config", &no_config(dir.path())])
        .args(["--recording", recording.to_str().unwrap()])
        .assert()
        .success();

    let report = stdout_json(output.get_output());
    assert_eq!(report["num_channels"], 2);
    assert_eq!(report["conditioned_samples"], 1000);
    assert!((report["conditioned_sample_rate"].as_f64().unwrap() - 125.0).abs() < 1e-6);

    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    let stimulated = &results[0];
    assert_eq!(stimulated["label"], "INJECT_15");
    assert_eq!(stimulated["decoded_label"], "INJECT_15");
    assert_eq!(stimulated["best_freq"], 15.0);
    assert!(stimulated["best_probability"].as_f64().unwrap() > 0.9);
    assert_eq!(stimulated["freqs"].as_array().unwrap().len(), 4);
    let total: f64 = stimulated["probabilities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_f64().unwrap())
        .sum();
    assert!((total - 1.0).abs() < 1e-9);

    let restricted = &results[1];
    assert_eq!(restricted["freqs"], serde_json::json!([12.0, 17.0]));

    let outside = &results[2];
    assert!(outside["skipped"].is_string());
    assert!(outside.get("best_freq").is_none());
}

#[test]
fn test_decode_with_uneven_chunks_keeps_the_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let recording = write_recording(
        dir.path(),
        serde_json::json!([{"onset_s": 3.5, "duration_s": 4.0, "label": "INJECT_15"}]),
    );

    for chunk in ["50", "37", "3"] {
        let output = bcpi()
            .args(["decode", "--quiet", "--compact", "--chunk-samples", chunk])
            .args(["--config", &no_config(dir.path())])
            .args(["--recording", recording.to_str().unwrap()])
            .assert()
            .success();

        let report = stdout_json(output.get_output());
        assert_eq!(report["conditioned_samples"], 1000, "chunk {}", chunk);

        let trial = &report["results"][0];
        assert_eq!(trial["decoded_label"], "INJECT_15");
        // First conditioned sample at or after 3.5 s is decimated index 437
        let timestamp = trial["timestamp"].as_f64().unwrap();
        assert!((timestamp - (437.0 * 0.008 + 0.004)).abs() < 1e-9, "chunk {}", chunk);
        assert_eq!(trial["freqs"].as_array().unwrap().len(), 4);
    }
}

#[test]
fn test_decode_whole_recording_with_freq_override() {
    let dir = tempfile::tempdir().unwrap();
    let recording = write_recording(dir.path(), serde_json::json!([]));
    let out = dir.path().join("result.json");

    bcpi()
        .args(["decode", "--quiet"])
        .args(["--config", &no_config(dir.path())])
        .args(["--recording", recording.to_str().unwrap()])
        .args(["-o", out.to_str().unwrap()])
        .args(["--harmonics", "1", "--freqs", "10", "15"])
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["freqs"], serde_json::json!([10.0, 15.0]));
    assert_eq!(results[0]["best_freq"], 15.0);
}

#[test]
fn test_decode_missing_recording() {
    let dir = tempfile::tempdir().unwrap();
    bcpi()
        .args(["decode", "--quiet"])
        .args(["--config", &no_config(dir.path())])
        .args(["--recording", "/nonexistent/recording.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read recording"));
}

#[test]
fn test_decode_rejects_band_above_nyquist() {
    let dir = tempfile::tempdir().unwrap();
    let recording = write_recording(dir.path(), serde_json::json!([]));
    let config = dir.path().join("config.json");
    // 60 Hz cutoff is above Nyquist once 250 Hz is decimated by 4
    std::fs::write(
        &config,
        r#"{"preproc": {"decimate": {"factor": 4}, "filter": {"order": 3, "cuton_hz": 5.0, "cutoff_hz": 60.0}}}"#,
    )
    .unwrap();

    bcpi()
        .args(["decode", "--quiet"])
        .args(["--config", config.to_str().unwrap()])
        .args(["--recording", recording.to_str().unwrap()])
        .assert()
        .code(3);
}

#[test]
fn test_decode_negative_integration_time_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let recording = write_recording(dir.path(), serde_json::json!([]));

    bcpi()
        .args(["decode", "--quiet"])
        .args(["--config", &no_config(dir.path())])
        .args(["--recording", recording.to_str().unwrap()])
        .args(["--max-int-time=-1"])
        .assert()
        .code(3);
}

//! Report output for CLI commands

use crate::exit_codes;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Where a command writes its JSON report
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// `-o <path>` selects a file, no flag means stdout
    pub fn from_arg(path: Option<&str>) -> Self {
        path.map_or(Destination::Stdout, |p| Destination::File(PathBuf::from(p)))
    }

    /// Write `text` followed by a newline
    pub fn write(&self, text: &str) -> Result<(), String> {
        match self {
            Destination::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", text).map_err(|e| format!("Failed to write to stdout: {}", e))
            }
            Destination::File(path) => std::fs::write(path, format!("{}\n", text))
                .map_err(|e| format!("Failed to write report '{}': {}", path.display(), e)),
        }
    }
}

/// Report as JSON, one line when `compact`
pub fn render<T: Serialize>(report: &T, compact: bool) -> Result<String, String> {
    let rendered = if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    };
    rendered.map_err(|e| format!("Cannot serialize report: {}", e))
}

/// Render and write a report, returning the command's exit code
pub fn emit<T: Serialize>(report: &T, compact: bool, destination: &Destination) -> i32 {
    match render(report, compact).and_then(|json| destination.write(&json)) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_from_arg() {
        assert_eq!(Destination::from_arg(None), Destination::Stdout);
        assert_eq!(
            Destination::from_arg(Some("out.json")),
            Destination::File(PathBuf::from("out.json"))
        );
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let report = serde_json::json!({"best_freq": 15.0, "freqs": [12.0, 15.0]});
        let compact = render(&report, true).unwrap();
        assert!(!compact.contains('\n'));
        assert!(render(&report, false).unwrap().lines().count() > 1);
    }

    #[test]
    fn test_file_destination_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let destination = Destination::File(path.clone());

        assert_eq!(emit(&vec![1, 2, 3], true, &destination), exit_codes::SUCCESS);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2,3]\n");
    }

    #[test]
    fn test_unwritable_file_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let destination = Destination::File(dir.path().join("missing").join("report.json"));
        assert_eq!(emit(&1, true, &destination), exit_codes::EXECUTION_ERROR);
    }
}

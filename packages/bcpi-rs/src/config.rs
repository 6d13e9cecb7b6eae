//! System configuration file
//!
//! The configuration is JSON. It is read from an explicit path, from
//! `$BCPI_CONFIG`, or from `<config dir>/bcpi/config.json`, in that order.
//! Files in a sibling `config.d/` directory (`*.json`, sorted by name) are
//! deep-merged on top. Every layer is merged over the defaults, so a file
//! only needs the keys it changes. Objects merge key by key; arrays, scalars
//! and the `mapping` table replace. When a layer replaces the mapping and no
//! layer sets `decode.default_freqs`, the candidates follow the mapping.

use crate::decoder::DecodeConfig;
use crate::error::{BcpiError, Result};
use crate::mapper::FrequencyMapper;
use crate::message::AxisRef;
use crate::signal_processing::PreprocConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "BCPI_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BcpiConfig {
    pub preproc: PreprocConfig,
    pub decode: DecodeConfig,
    /// Stimulus class label -> frequency (Hz)
    pub mapping: FrequencyMapper,
    /// Where recordings and trial data are kept
    pub data_dir: PathBuf,
    /// Samples per segment delivered by the acquisition device
    pub chunk_samples: usize,
}

impl Default for BcpiConfig {
    fn default() -> Self {
        let mapping = FrequencyMapper::default();
        Self {
            preproc: PreprocConfig::standard_ssvep(),
            decode: DecodeConfig {
                time_axis: AxisRef::from("time"),
                default_freqs: mapping.frequencies(),
                ..Default::default()
            },
            mapping,
            data_dir: default_data_dir(),
            chunk_samples: 50,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bcpi-data")
}

impl BcpiConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bcpi")
            .join("config.json")
    }

    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(Self::default_path),
        }
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(&Self::resolve_path(explicit))
    }

    /// Load `path` plus its drop-in directory and validate the result
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut sources = Vec::new();
        if path.is_file() {
            sources.push(path.to_path_buf());
        }
        sources.extend(drop_in_files(path)?);

        if sources.is_empty() {
            log::info!("No configuration at {}, using defaults", path.display());
        }

        let mut merged = serde_json::to_value(BcpiConfig::default())?;
        let (mut mapping_set, mut freqs_set) = (false, false);
        for source in &sources {
            let text = std::fs::read_to_string(source)?;
            let mut layer: Value = serde_json::from_str(&text)?;
            log::debug!("Loaded configuration layer {}", source.display());

            if let Value::Object(fields) = &mut layer {
                let mapping = fields.remove("mapping");
                if let (Some(mapping), Value::Object(base)) = (mapping, &mut merged) {
                    base.insert("mapping".to_string(), mapping);
                    mapping_set = true;
                }
                freqs_set |= fields
                    .get("decode")
                    .and_then(|decode| decode.get("default_freqs"))
                    .is_some();
            }
            merge(&mut merged, layer);
        }

        let mut config: BcpiConfig = serde_json::from_value(merged)?;
        if mapping_set && !freqs_set {
            config.decode.default_freqs = config.mapping.frequencies();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.preproc.validate(None)?;
        self.decode.validate()?;

        if let Some((label, freq)) = self
            .mapping
            .mapping()
            .iter()
            .find(|(_, f)| !(f.is_finite() && **f > 0.0))
        {
            return Err(BcpiError::Configuration(format!(
                "Mapping '{}' has invalid frequency {}",
                label, freq
            )));
        }

        if self.chunk_samples == 0 {
            return Err(BcpiError::Configuration(
                "chunk_samples must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn drop_in_files(path: &Path) -> Result<Vec<PathBuf>> {
    let dir = path.with_extension("d");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = dir.join("*.json");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| BcpiError::Glob(format!("Non UTF-8 path {}", dir.display())))?;

    let mut files = glob::glob(pattern)
        .map_err(|e| BcpiError::Glob(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BcpiError::Glob(e.to_string()))?;
    files.sort();
    Ok(files)
}

/// Objects merge key by key; anything else in `overlay` replaces `base`
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

//! Mapping between stimulus class labels and stimulation frequencies

use crate::decoder::FrequencyPosterior;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FREQ_MATCH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyMapper {
    mapping: BTreeMap<String, f64>,
}

impl Default for FrequencyMapper {
    /// Injected test classes used on the device
    fn default() -> Self {
        Self::new(
            [
                ("INJECT_12", 12.0),
                ("INJECT_15", 15.0),
                ("INJECT_17", 17.0),
                ("INJECT_20", 20.0),
            ]
            .into_iter()
            .map(|(label, freq)| (label.to_string(), freq))
            .collect(),
        )
    }
}

impl FrequencyMapper {
    pub fn new(mapping: BTreeMap<String, f64>) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &BTreeMap<String, f64> {
        &self.mapping
    }

    pub fn frequency_for(&self, label: &str) -> Option<f64> {
        self.mapping.get(label).copied()
    }

    pub fn label_for(&self, freq: f64) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(_, f)| (**f - freq).abs() < FREQ_MATCH_TOLERANCE)
            .map(|(label, _)| label.as_str())
    }

    /// Label of the most probable frequency in a posterior
    pub fn label_for_posterior(&self, posterior: &FrequencyPosterior) -> Option<&str> {
        posterior
            .best()
            .and_then(|(freq, _)| self.label_for(freq))
    }

    /// All frequencies, in label order
    pub fn frequencies(&self) -> Vec<f64> {
        self.mapping.values().copied().collect()
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for one analysis run.
///
/// Passed explicitly through the pipeline so runs with different
/// thresholds can execute side by side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum prior-day open interest for a row to count as liquid.
    #[serde(default = "default_oi_floor")]
    pub oi_floor: f64,
    /// Rows trimmed from each end of a contract to drop rollover noise.
    #[serde(default = "default_rollover_trim")]
    pub rollover_trim: usize,
    /// Contracts with at most this many rows are discarded outright.
    #[serde(default = "default_min_contract_rows")]
    pub min_contract_rows: usize,
    /// Trailing window for the open-interest average.
    #[serde(default = "default_oi_avg_window")]
    pub oi_avg_window: usize,
    /// Defined observations required inside the window before the
    /// average produces a value.
    #[serde(default = "default_oi_avg_min_periods")]
    pub oi_avg_min_periods: usize,
}

fn default_oi_floor() -> f64 {
    2000.0
}

fn default_rollover_trim() -> usize {
    3
}

fn default_min_contract_rows() -> usize {
    6
}

fn default_oi_avg_window() -> usize {
    20
}

fn default_oi_avg_min_periods() -> usize {
    5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            oi_floor: default_oi_floor(),
            rollover_trim: default_rollover_trim(),
            min_contract_rows: default_min_contract_rows(),
            oi_avg_window: default_oi_avg_window(),
            oi_avg_min_periods: default_oi_avg_min_periods(),
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file; absent keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

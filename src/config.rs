use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::decoder::{DEFAULT_CORRECTION_SCALAR, DecodeOptions};
use crate::export::DatasetFormat;

// ---------------------------------------------------------------------------
// Batch configuration
// ---------------------------------------------------------------------------

/// Settings for one batch conversion. Read from an optional TOML file; the
/// CLI overrides individual fields afterwards.
///
/// ```toml
/// run_extension = "D"
/// signal_extension = "ch"
/// output_suffix = "_abs.txt"
/// correction_scalar = 1.0
/// dataset = "parquet"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Extension of run directories (`SAMPLE01.D`).
    pub run_extension: String,
    /// Extension of the signal file inside a run directory.
    pub signal_extension: String,
    /// Appended to the run name to form the table file name.
    pub output_suffix: String,
    /// Where tables and datasets go. `None` means the experiment directory.
    pub output_dir: Option<PathBuf>,
    pub correction_scalar: f64,
    /// Also write all runs into one dataset file of this format.
    pub dataset: Option<DatasetFormat>,
    /// Worker threads; `None` lets rayon decide.
    pub jobs: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            run_extension: "D".to_string(),
            signal_extension: "ch".to_string(),
            output_suffix: ".txt".to_string(),
            output_dir: None,
            correction_scalar: DEFAULT_CORRECTION_SCALAR,
            dataset: None,
            jobs: None,
        }
    }
}

impl BatchConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing batch configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            correction_scalar: self.correction_scalar,
        }
    }

    /// Output directory for an experiment rooted at `experiment_dir`.
    pub fn output_dir_for(&self, experiment_dir: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| experiment_dir.to_path_buf())
    }
}

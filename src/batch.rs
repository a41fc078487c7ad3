use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::config::BatchConfig;
use crate::data::loader::{has_extension, load_run_dir};
use crate::data::metadata::{MetadataProvider, default_providers};
use crate::data::model::LoadedRun;
use crate::export::{export_dataset, export_tsv};

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// A run directory that could not be converted.
#[derive(Debug)]
pub struct RunFailure {
    pub run_dir: PathBuf,
    pub error: anyhow::Error,
}

/// Outcome of converting every run in an experiment directory.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Tables written, in run order.
    pub converted: Vec<PathBuf>,
    pub failed: Vec<RunFailure>,
    /// The aggregate dataset, when one was requested and any run succeeded.
    pub dataset: Option<PathBuf>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Run directories directly inside `experiment_dir`, sorted by path.
pub fn find_run_dirs(experiment_dir: &Path, run_extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(experiment_dir)
        .with_context(|| format!("listing {}", experiment_dir.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", experiment_dir.display()))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && has_extension(&entry.file_name().to_string_lossy(), run_extension) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Table path for a run: `<out_dir>/<run name><suffix>`.
pub fn table_path(out_dir: &Path, run: &LoadedRun, suffix: &str) -> PathBuf {
    out_dir.join(format!("{}{suffix}", run.name))
}

/// Decode one run directory and write its table.
pub fn convert_run(
    run_dir: &Path,
    config: &BatchConfig,
    providers: &[Box<dyn MetadataProvider>],
    out_dir: &Path,
) -> Result<(LoadedRun, PathBuf)> {
    let run = load_run_dir(
        run_dir,
        &config.signal_extension,
        &config.decode_options(),
        providers,
    )?;
    let path = table_path(out_dir, &run, &config.output_suffix);
    export_tsv(&run, &path)?;
    Ok((run, path))
}

/// Convert every run directory in `experiment_dir`. A failing run is logged
/// and reported; the remaining runs are still converted.
pub fn run_batch(experiment_dir: &Path, config: &BatchConfig) -> Result<BatchReport> {
    let run_dirs = find_run_dirs(experiment_dir, &config.run_extension)?;
    let out_dir = config.output_dir_for(experiment_dir);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    log::info!(
        "{}: {} .{} run directories",
        experiment_dir.display(),
        run_dirs.len(),
        config.run_extension
    );

    let providers = default_providers();
    let convert_all = || {
        run_dirs
            .par_iter()
            .map(|dir| (dir, convert_run(dir, config, &providers, &out_dir)))
            .collect::<Vec<_>>()
    };
    let results = match config.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("starting worker pool")?
            .install(convert_all),
        None => convert_all(),
    };

    let mut report = BatchReport::default();
    let mut runs = Vec::new();
    for (dir, result) in results {
        match result {
            Ok((run, path)) => {
                log::info!(
                    "{} -> {} ({} samples)",
                    dir.display(),
                    path.display(),
                    run.trace.len()
                );
                report.converted.push(path);
                runs.push(run);
            }
            Err(error) => {
                log::warn!("{}: {error:#}", dir.display());
                report.failed.push(RunFailure {
                    run_dir: dir.clone(),
                    error,
                });
            }
        }
    }

    if let Some(format) = config.dataset {
        if !runs.is_empty() {
            let stem = experiment_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string());
            let path = out_dir.join(format!("{stem}.{}", format.extension()));
            export_dataset(&runs, format, &path)?;
            log::info!("dataset with {} runs -> {}", runs.len(), path.display());
            report.dataset = Some(path);
        }
    }

    Ok(report)
}

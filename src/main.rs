use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use log::LevelFilter;

use rusty_chroma::batch::run_batch;
use rusty_chroma::config::BatchConfig;
use rusty_chroma::export::DatasetFormat;

/// Convert every `.D` run directory in an experiment folder into a
/// tab-separated absorbance table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Experiment directory containing the run directories.
    experiment_dir: PathBuf,
    /// TOML file with batch settings; flags below take precedence.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Write tables here instead of the experiment directory.
    #[clap(long, short)]
    output_dir: Option<PathBuf>,
    /// Appended to the run name to form the table file name.
    #[clap(long)]
    suffix: Option<String>,
    /// Extension of run directories.
    #[clap(long)]
    run_extension: Option<String>,
    /// Extension of the signal file inside each run directory.
    #[clap(long)]
    signal_extension: Option<String>,
    /// Multiplier between stored and displayed absorbance.
    #[clap(long)]
    correction_scalar: Option<f64>,
    /// Also write all runs into one dataset file.
    #[clap(long, value_enum)]
    dataset: Option<DatasetFormat>,
    /// Number of worker threads.
    #[clap(long, short)]
    jobs: Option<usize>,
    /// Log per-run details.
    #[clap(long, short)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<(PathBuf, BatchConfig)> {
        let mut config = match &self.config {
            Some(path) => BatchConfig::load(path)?,
            None => BatchConfig::default(),
        };
        if let Some(dir) = self.output_dir {
            config.output_dir = Some(dir);
        }
        if let Some(suffix) = self.suffix {
            config.output_suffix = suffix;
        }
        if let Some(ext) = self.run_extension {
            config.run_extension = ext;
        }
        if let Some(ext) = self.signal_extension {
            config.signal_extension = ext;
        }
        if let Some(scalar) = self.correction_scalar {
            config.correction_scalar = scalar;
        }
        if self.dataset.is_some() {
            config.dataset = self.dataset;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        Ok((self.experiment_dir, config))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let (experiment_dir, config) = args.into_config()?;
    let report = run_batch(&experiment_dir, &config)?;

    log::info!(
        "converted {} runs, {} failed",
        report.converted.len(),
        report.failed.len()
    );
    if !report.is_success() {
        bail!("{} run(s) could not be converted", report.failed.len());
    }
    Ok(())
}

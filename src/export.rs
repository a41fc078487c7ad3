use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use crate::data::model::{LoadedRun, SampleMetadata, Trace};

// ---------------------------------------------------------------------------
// Tab-separated table, one per run
// ---------------------------------------------------------------------------

/// Write the time/absorbance table for one trace. Metadata cells appear on
/// the first data row only and are left empty when unknown.
pub fn write_tsv<W: Write>(
    trace: &Trace,
    metadata: Option<&SampleMetadata>,
    out: W,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(out);

    let absorbance = format!("Abs[{}nm] (mAU)", trace.header.channel_label);
    writer.write_record([
        "Time(min)",
        absorbance.as_str(),
        "sample name",
        "sample amount",
        "dilution factor",
        "description",
    ])?;

    let empty = SampleMetadata::default();
    let meta = metadata.unwrap_or(&empty);
    let cell = |v: &Option<String>| v.clone().unwrap_or_default();

    for (i, (t, y)) in trace.points().enumerate() {
        if i == 0 {
            writer.write_record([
                format_float(t),
                format_float(y),
                cell(&meta.sample_name),
                cell(&meta.sample_amount),
                cell(&meta.dilution_factor),
                cell(&meta.sample_description),
            ])?;
        } else {
            writer.write_record([format_float(t), format_float(y)])?;
        }
    }

    writer.flush().context("flushing table")?;
    Ok(())
}

/// Write the table for `run` to `path`.
pub fn export_tsv(run: &LoadedRun, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_tsv(&run.trace, run.metadata.as_ref(), BufWriter::new(file))
        .with_context(|| format!("writing {}", path.display()))
}

/// Shortest round-trip text for `v`, always with a decimal point or
/// exponent (`0.0`, `0.015`, `1e-7`).
pub fn format_float(v: f64) -> String {
    format!("{v:?}")
}

// ---------------------------------------------------------------------------
// Aggregate datasets
// ---------------------------------------------------------------------------

/// File format for the optional whole-batch dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Json,
    Parquet,
}

impl DatasetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DatasetFormat::Json => "json",
            DatasetFormat::Parquet => "parquet",
        }
    }
}

/// Write every run into one dataset file.
pub fn export_dataset(runs: &[LoadedRun], format: DatasetFormat, path: &Path) -> Result<()> {
    match format {
        DatasetFormat::Json => export_json(runs, path),
        DatasetFormat::Parquet => export_parquet(runs, path),
    }
    .with_context(|| format!("writing dataset {}", path.display()))
}

/// One row of the dataset: the trace as `x`/`y` plus flat metadata columns.
#[derive(Debug, Serialize)]
struct DatasetRecord<'a> {
    x: &'a [f64],
    y: &'a [f64],
    run: &'a str,
    channel: &'a str,
    #[serde(flatten)]
    metadata: SampleMetadata,
}

impl<'a> DatasetRecord<'a> {
    fn from_run(run: &'a LoadedRun) -> Self {
        DatasetRecord {
            x: &run.trace.time_axis,
            y: &run.trace.samples,
            run: &run.name,
            channel: &run.trace.header.channel_label,
            metadata: run.metadata.clone().unwrap_or_default(),
        }
    }
}

/// Records-oriented JSON array: `[{ "x": [...], "y": [...], "run": ..., ... }]`.
pub fn write_json<W: Write>(runs: &[LoadedRun], out: W) -> Result<()> {
    let records: Vec<DatasetRecord> = runs.iter().map(DatasetRecord::from_run).collect();
    serde_json::to_writer(out, &records).context("serialising dataset")?;
    Ok(())
}

fn export_json(runs: &[LoadedRun], path: &Path) -> Result<()> {
    let file = File::create(path).context("creating JSON file")?;
    let mut out = BufWriter::new(file);
    write_json(runs, &mut out)?;
    out.flush().context("flushing JSON file")?;
    Ok(())
}

/// Build the Arrow batch behind the Parquet export.
///
/// Schema:
/// - `x`, `y`: List<Float64> – retention time and absorbance
/// - `run`, `channel`: Utf8
/// - `sample_name`, `sample_amount`, `multiplier`, `dilution_factor`,
///   `sample_description`: nullable Utf8
pub fn dataset_batch(runs: &[LoadedRun]) -> Result<RecordBatch> {
    let list_of = |select: fn(&Trace) -> &[f64]| {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for run in runs {
            builder.values().append_slice(select(&run.trace));
            builder.append(true);
        }
        builder.finish()
    };
    let x_array = list_of(|t| t.time_axis.as_slice());
    let y_array = list_of(|t| t.samples.as_slice());

    let text = |select: fn(&LoadedRun) -> Option<&str>| {
        Arc::new(StringArray::from(runs.iter().map(select).collect::<Vec<_>>())) as ArrayRef
    };
    fn meta(run: &LoadedRun, pick: fn(&SampleMetadata) -> &Option<String>) -> Option<&str> {
        run.metadata.as_ref().and_then(|m| pick(m).as_deref())
    }

    let list_field = |name: &str| {
        Field::new(
            name,
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        )
    };
    let schema = Arc::new(Schema::new(vec![
        list_field("x"),
        list_field("y"),
        Field::new("run", DataType::Utf8, false),
        Field::new("channel", DataType::Utf8, false),
        Field::new("sample_name", DataType::Utf8, true),
        Field::new("sample_amount", DataType::Utf8, true),
        Field::new("multiplier", DataType::Utf8, true),
        Field::new("dilution_factor", DataType::Utf8, true),
        Field::new("sample_description", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(x_array) as ArrayRef,
            Arc::new(y_array) as ArrayRef,
            text(|r| Some(r.name.as_str())),
            text(|r| Some(r.trace.header.channel_label.as_str())),
            text(|r| meta(r, |m| &m.sample_name)),
            text(|r| meta(r, |m| &m.sample_amount)),
            text(|r| meta(r, |m| &m.multiplier)),
            text(|r| meta(r, |m| &m.dilution_factor)),
            text(|r| meta(r, |m| &m.sample_description)),
        ],
    )
    .context("assembling record batch")?;
    Ok(batch)
}

fn export_parquet(runs: &[LoadedRun], path: &Path) -> Result<()> {
    let batch = dataset_batch(runs)?;
    let file = File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

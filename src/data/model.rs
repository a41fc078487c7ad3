use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SignalHeader – fixed-offset fields of a signal file
// ---------------------------------------------------------------------------

/// Scalar fields read from fixed offsets at the start of a signal file.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHeader {
    /// Acquisition channel, usually the detection wavelength in nm.
    pub channel_label: String,
    /// Multiplier applied to every raw delta before accumulation.
    pub scale_factor: f64,
    /// Acquisition start in 1/60000-minute units.
    pub start_time_raw: i32,
    /// Acquisition end in 1/60000-minute units.
    pub end_time_raw: i32,
}

/// Raw time units per minute.
pub const TIME_UNITS_PER_MINUTE: f64 = 60000.0;

impl SignalHeader {
    pub fn start_time_minutes(&self) -> f64 {
        self.start_time_raw as f64 / TIME_UNITS_PER_MINUTE
    }

    pub fn end_time_minutes(&self) -> f64 {
        self.end_time_raw as f64 / TIME_UNITS_PER_MINUTE
    }
}

// ---------------------------------------------------------------------------
// RunRecord – transient pieces of the delta stream
// ---------------------------------------------------------------------------

/// Two-byte header opening every run in the delta stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHeader {
    pub marker: u8,
    pub record_count: u8,
}

impl RunHeader {
    /// `(0, 0)` ends the stream.
    pub fn is_terminal(&self) -> bool {
        self.marker == 0 && self.record_count == 0
    }
}

/// One value read from a run, before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDelta {
    /// Plain 16-bit delta.
    Short(i16),
    /// 32-bit value that followed the escape sentinel.
    Escaped(i32),
}

impl RawDelta {
    pub fn value(self) -> i64 {
        match self {
            RawDelta::Short(v) => v as i64,
            RawDelta::Escaped(v) => v as i64,
        }
    }
}

// ---------------------------------------------------------------------------
// Trace – the decoded result
// ---------------------------------------------------------------------------

/// A fully decoded signal file. `samples` and `time_axis` always have the
/// same non-zero length.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub header: SignalHeader,
    /// Absorbance values after the correction scalar.
    pub samples: Vec<f64>,
    /// Retention time in minutes for each sample.
    pub time_axis: Vec<f64>,
}

impl Trace {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a trace produced by the loader.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(time, absorbance)` pairs in acquisition order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time_axis
            .iter()
            .copied()
            .zip(self.samples.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// SampleMetadata – companion information from sidecar files
// ---------------------------------------------------------------------------

/// Sample description harvested from a run directory. Values are kept as the
/// text found in the source document; nothing is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub sample_name: Option<String>,
    pub sample_amount: Option<String>,
    pub multiplier: Option<String>,
    pub dilution_factor: Option<String>,
    pub sample_description: Option<String>,
}

impl SampleMetadata {
    /// Whether no field was populated.
    pub fn is_empty(&self) -> bool {
        self.sample_name.is_none()
            && self.sample_amount.is_none()
            && self.multiplier.is_none()
            && self.dilution_factor.is_none()
            && self.sample_description.is_none()
    }
}

// ---------------------------------------------------------------------------
// LoadedRun – one `.D` directory after loading
// ---------------------------------------------------------------------------

/// A run directory together with its decoded trace and optional metadata.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    /// Directory name without its extension, e.g. `SAMPLE01` for `SAMPLE01.D`.
    pub name: String,
    /// The signal file that was decoded.
    pub signal_path: PathBuf,
    pub trace: Trace,
    pub metadata: Option<SampleMetadata>,
}

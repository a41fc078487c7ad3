//! Decoder and batch converter for ChemStation `.D` run directories.
//!
//! The core reads the binary signal file (`*.ch`) into a [`Trace`]: the
//! fixed-offset header, the escape-coded delta runs and the implied time
//! axis. Around it sit sidecar metadata providers, a tab-separated table
//! export and a batch driver over an experiment directory.
//!
//! [`Trace`]: data::model::Trace

pub mod batch;
pub mod config;
pub mod data;
pub mod export;

pub use data::decoder::{DEFAULT_CORRECTION_SCALAR, DecodeOptions};
pub use data::error::DecodeError;
pub use data::loader::{decode_trace, load_run_dir, load_signal_file};
pub use data::model::{LoadedRun, SampleMetadata, SignalHeader, Trace};

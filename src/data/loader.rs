use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::decoder::{DecodeOptions, apply_correction, decode_runs};
use super::error::DecodeError;
use super::header::read_header;
use super::metadata::{MetadataProvider, resolve_metadata};
use super::model::{LoadedRun, Trace};
use super::time_axis::time_axis;

// ---------------------------------------------------------------------------
// Trace assembly
// ---------------------------------------------------------------------------

/// Decode a signal from any seekable source: header, run stream, correction,
/// time axis. The first failing step aborts the decode.
pub fn decode_trace<R: Read + Seek>(
    src: &mut R,
    options: &DecodeOptions,
) -> Result<Trace, DecodeError> {
    let header = read_header(src)?;
    let mut samples = decode_runs(src, header.scale_factor)?;
    apply_correction(&mut samples, options.correction_scalar);
    let time_axis = time_axis(
        header.start_time_minutes(),
        header.end_time_minutes(),
        samples.len(),
    )?;

    Ok(Trace {
        header,
        samples,
        time_axis,
    })
}

/// Open and decode one signal file. The handle is dropped on every path.
pub fn load_signal_file(path: &Path, options: &DecodeOptions) -> Result<Trace, DecodeError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    decode_trace(&mut reader, options)
}

// ---------------------------------------------------------------------------
// Run directories
// ---------------------------------------------------------------------------

/// Decode the signal inside a `.D` run directory and attach whatever sample
/// metadata the providers can find.
///
/// The signal is the first file (by name) whose extension matches
/// `signal_extension`, compared case-insensitively.
pub fn load_run_dir(
    dir: &Path,
    signal_extension: &str,
    options: &DecodeOptions,
    providers: &[Box<dyn MetadataProvider>],
) -> Result<LoadedRun> {
    let signals = files_matching(dir, |name| has_extension(name, signal_extension))?;
    let Some(signal_path) = signals.first().cloned() else {
        bail!("no .{signal_extension} signal file in {}", dir.display());
    };
    if signals.len() > 1 {
        log::debug!(
            "{}: {} signal files, using {}",
            dir.display(),
            signals.len(),
            signal_path.display()
        );
    }

    let trace = load_signal_file(&signal_path, options)
        .with_context(|| format!("decoding {}", signal_path.display()))?;
    log::debug!(
        "{}: {} samples, channel {}",
        signal_path.display(),
        trace.len(),
        trace.header.channel_label
    );

    let metadata = resolve_metadata(providers, dir);

    Ok(LoadedRun {
        name: run_name(dir),
        signal_path,
        trace,
        metadata,
    })
}

/// Directory name without its extension: `…/SAMPLE01.D` → `SAMPLE01`.
pub fn run_name(dir: &Path) -> String {
    dir.file_stem()
        .or_else(|| dir.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether `name` ends in `.ext`, ignoring ASCII case.
pub fn has_extension(name: &str, ext: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Regular files directly inside `dir` whose name satisfies `accept`,
/// sorted by path.
pub fn files_matching(dir: &Path, accept: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && accept(&entry.file_name().to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

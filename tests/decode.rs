mod common;

use std::io::Cursor;

use common::{Raw, SignalFile, assert_close, synthetic_counts};
use rusty_chroma::{DecodeError, DecodeOptions, decode_trace, load_signal_file};

fn decode(file: &SignalFile) -> Result<rusty_chroma::Trace, DecodeError> {
    decode_trace(&mut Cursor::new(file.bytes()), &DecodeOptions::default())
}

#[test]
fn three_sample_scenario() {
    let file = SignalFile::new("DAD1 A, Sig=254,4 Ref=off", 0.001, 0, 60000)
        .run(&[Raw::S(100), Raw::S(50), Raw::S(-20)])
        .terminate();

    let trace = decode(&file).unwrap();
    assert_eq!(trace.header.channel_label, "254");
    assert_close(&trace.samples, &[0.01, 0.015, 0.013]);
    assert_eq!(trace.time_axis, vec![0.0, 0.5, 1.0]);
}

#[test]
fn escaped_value_restarts_accumulation() {
    let file = SignalFile::new("Sig=280", 1.0, 0, 60000)
        .run(&[Raw::S(7), Raw::E(1_000_000), Raw::S(-3)])
        .terminate();

    let trace = decode(&file).unwrap();
    assert_close(&trace.samples, &[0.7, 100_000.0, 99_999.7]);
}

#[test]
fn correction_scalar_is_overridable() {
    let file = SignalFile::new("Sig=254", 0.5, 0, 60000)
        .run(&[Raw::S(2), Raw::S(2)])
        .terminate();
    let options = DecodeOptions {
        correction_scalar: 1.0,
    };
    let trace = decode_trace(&mut Cursor::new(file.bytes()), &options).unwrap();
    assert_close(&trace.samples, &[1.0, 2.0]);
}

#[test]
fn synthetic_chromatogram_round_trips() {
    let counts = synthetic_counts(500, 7);
    let scale = 0.000_953_674_316_406_25;
    let file = SignalFile::new("DAD1 B, Sig=214,4 Ref=360,100", scale, 30_000, 1_830_000)
        .counts(&counts)
        .terminate();

    let trace = decode(&file).unwrap();
    let expected: Vec<f64> = counts.iter().map(|&c| c as f64 * scale * 0.1).collect();
    assert_close(&trace.samples, &expected);

    assert_eq!(trace.header.channel_label, "214");
    assert_eq!(trace.samples.len(), trace.time_axis.len());
    assert_eq!(trace.time_axis[0], 0.5);
    assert_eq!(*trace.time_axis.last().unwrap(), 30.5);
    assert!(trace.time_axis.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn decoding_is_deterministic() {
    let file = SignalFile::new("Sig=254", 0.001, 0, 600_000)
        .counts(&synthetic_counts(2000, 3))
        .terminate();

    let first = decode(&file).unwrap();
    let second = decode(&file).unwrap();
    let bits = |t: &rusty_chroma::Trace| t.samples.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn single_sample_sits_at_start_time() {
    let file = SignalFile::new("Sig=254", 1.0, 120_000, 180_000)
        .run(&[Raw::S(5)])
        .terminate();
    let trace = decode(&file).unwrap();
    assert_eq!(trace.time_axis, vec![2.0]);
}

#[test]
fn immediate_terminal_is_empty_trace() {
    let file = SignalFile::new("Sig=254", 1.0, 0, 60000).terminate();
    assert!(matches!(decode(&file), Err(DecodeError::EmptyTrace)));
}

#[test]
fn missing_terminal_is_truncated() {
    let file = SignalFile::new("Sig=254", 1.0, 0, 60000).run(&[Raw::S(1)]);
    assert!(matches!(
        decode(&file),
        Err(DecodeError::TruncatedStream { offset: 0x1804, .. })
    ));
}

#[test]
fn escape_needs_four_more_bytes() {
    let file = SignalFile::new("Sig=254", 1.0, 0, 60000).raw(&[1, 1, 0x80, 0x00, 0x00, 0x01]);
    assert!(matches!(
        decode(&file),
        Err(DecodeError::TruncatedStream { offset: 0x1804, .. })
    ));
}

#[test]
fn run_shorter_than_declared_is_truncated() {
    let file = SignalFile::new("Sig=254", 1.0, 0, 60000).raw(&[1, 4, 0x00, 0x01, 0x00, 0x02]);
    assert!(matches!(
        decode(&file),
        Err(DecodeError::TruncatedStream { offset: 0x1806, .. })
    ));
}

#[test]
fn label_without_separator_is_malformed() {
    let file = SignalFile::new("DAD1 A", 1.0, 0, 60000)
        .run(&[Raw::S(1)])
        .terminate();
    assert!(matches!(
        decode(&file),
        Err(DecodeError::MalformedHeader { .. })
    ));
}

#[test]
fn file_shorter_than_header_is_malformed() {
    let bytes = SignalFile::new("Sig=254", 1.0, 0, 60000).bytes();
    let cut = bytes[..0x1200].to_vec();
    let result = decode_trace(&mut Cursor::new(cut), &DecodeOptions::default());
    assert!(matches!(result, Err(DecodeError::MalformedHeader { .. })));
}

#[test]
fn loads_from_disk_and_reports_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("DAD1A.ch");
    SignalFile::new("Sig=254", 0.001, 0, 60000)
        .run(&[Raw::S(100), Raw::S(50), Raw::S(-20)])
        .terminate()
        .write_to(&path);

    let trace = load_signal_file(&path, &DecodeOptions::default()).unwrap();
    assert_eq!(trace.len(), 3);

    let missing = load_signal_file(&dir.path().join("nope.ch"), &DecodeOptions::default());
    assert!(matches!(missing, Err(DecodeError::Io(_))));
}

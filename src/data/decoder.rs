use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use super::error::DecodeError;
use super::model::{RawDelta, RunHeader};

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// Start of the run stream.
pub const DATA_OFFSET: u64 = 0x1800;
/// A 16-bit value equal to this announces a 32-bit value right after it.
pub const ESCAPE_SENTINEL: i16 = i16::MIN;
/// Factor between on-disk amplitudes and what the instrument software
/// displays (the files read 10x higher). Override via [`DecodeOptions`].
pub const DEFAULT_CORRECTION_SCALAR: f64 = 0.1;

/// Tunables that belong to the instrument rather than the file format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    pub correction_scalar: f64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            correction_scalar: DEFAULT_CORRECTION_SCALAR,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder state machine
// ---------------------------------------------------------------------------

/// Whether the next value is taken as-is or added to the previous sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecoderState {
    /// No sample decoded yet.
    AwaitingAbsolute,
    /// `last` is the most recent decoded sample.
    Accumulating { last: f64 },
}

impl DecoderState {
    /// Decode one raw value and return it with the follow-up state.
    ///
    /// Escaped values are absolute and restart accumulation; so is the very
    /// first value of the stream. Every other value is a delta on `last`.
    pub fn step(self, raw: RawDelta, scale_factor: f64) -> (f64, DecoderState) {
        let scaled = scale_factor * raw.value() as f64;
        let value = match (self, raw) {
            (_, RawDelta::Escaped(_)) | (DecoderState::AwaitingAbsolute, _) => scaled,
            (DecoderState::Accumulating { last }, RawDelta::Short(_)) => last + scaled,
        };
        (value, DecoderState::Accumulating { last: value })
    }
}

// ---------------------------------------------------------------------------
// Run stream reader
// ---------------------------------------------------------------------------

/// Decode the run stream at [`DATA_OFFSET`] into scaled samples, before the
/// correction scalar. Fails with [`DecodeError::EmptyTrace`] when the stream
/// holds no samples.
pub fn decode_runs<R: Read + Seek>(
    src: &mut R,
    scale_factor: f64,
) -> Result<Vec<f64>, DecodeError> {
    src.seek(SeekFrom::Start(DATA_OFFSET))
        .map_err(|e| DecodeError::from_stream_io(e, DATA_OFFSET, "run header"))?;
    decode_stream(src, scale_factor, DATA_OFFSET)
}

/// Decode runs from the current position of `src`. `offset` is only used
/// to report where a truncation happened.
pub fn decode_stream<R: Read>(
    src: &mut R,
    scale_factor: f64,
    offset: u64,
) -> Result<Vec<f64>, DecodeError> {
    let mut reader = RunReader { src, offset };
    let mut state = DecoderState::AwaitingAbsolute;
    let mut samples = Vec::new();
    let mut runs = 0usize;

    loop {
        let run = reader.run_header()?;
        if run.is_terminal() {
            break;
        }
        runs += 1;
        samples.reserve(run.record_count as usize);
        for _ in 0..run.record_count {
            let raw = reader.raw_delta()?;
            let (value, next) = state.step(raw, scale_factor);
            samples.push(value);
            state = next;
        }
    }

    log::debug!("decoded {} samples from {runs} runs", samples.len());

    if samples.is_empty() {
        return Err(DecodeError::EmptyTrace);
    }
    Ok(samples)
}

/// Multiply every sample by the correction scalar in place.
pub fn apply_correction(samples: &mut [f64], correction_scalar: f64) {
    for s in samples.iter_mut() {
        *s *= correction_scalar;
    }
}

struct RunReader<'a, R> {
    src: &'a mut R,
    offset: u64,
}

impl<R: Read> RunReader<'_, R> {
    fn run_header(&mut self) -> Result<RunHeader, DecodeError> {
        let at = self.offset;
        let mut buf = [0u8; 2];
        self.src
            .read_exact(&mut buf)
            .map_err(|e| DecodeError::from_stream_io(e, at, "run header"))?;
        self.offset += 2;
        Ok(RunHeader {
            marker: buf[0],
            record_count: buf[1],
        })
    }

    fn raw_delta(&mut self) -> Result<RawDelta, DecodeError> {
        let at = self.offset;
        let short = self
            .src
            .read_i16::<BigEndian>()
            .map_err(|e| DecodeError::from_stream_io(e, at, "run value"))?;
        self.offset += 2;
        if short != ESCAPE_SENTINEL {
            return Ok(RawDelta::Short(short));
        }

        let at = self.offset;
        let wide = self
            .src
            .read_i32::<BigEndian>()
            .map_err(|e| DecodeError::from_stream_io(e, at, "escaped 32-bit value"))?;
        self.offset += 4;
        Ok(RawDelta::Escaped(wide))
    }
}

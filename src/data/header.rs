use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use super::error::DecodeError;
use super::model::SignalHeader;

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// Length-prefixed UTF-16 signal description, e.g. `DAD1 A, Sig=254,4 Ref=off`.
pub const LABEL_OFFSET: u64 = 0x1075;
/// Big-endian `f64` applied to every raw delta.
pub const SCALE_FACTOR_OFFSET: u64 = 0x127C;
/// Two big-endian `i32`: start and end time.
pub const TIME_RANGE_OFFSET: u64 = 0x11A;

// ---------------------------------------------------------------------------
// Header reader
// ---------------------------------------------------------------------------

/// Read the fixed-offset header fields. Leaves the source position
/// unspecified; callers seek before reading anything else.
pub fn read_header<R: Read + Seek>(src: &mut R) -> Result<SignalHeader, DecodeError> {
    let description = read_label_text(src)?;
    let channel_label = parse_channel_label(&description)?;

    seek_to(src, SCALE_FACTOR_OFFSET, "scale factor")?;
    let scale_factor = src
        .read_f64::<BigEndian>()
        .map_err(|e| DecodeError::from_header_io(e, "scale factor", SCALE_FACTOR_OFFSET))?;

    seek_to(src, TIME_RANGE_OFFSET, "time range")?;
    let start_time_raw = src
        .read_i32::<BigEndian>()
        .map_err(|e| DecodeError::from_header_io(e, "start time", TIME_RANGE_OFFSET))?;
    let end_time_raw = src
        .read_i32::<BigEndian>()
        .map_err(|e| DecodeError::from_header_io(e, "end time", TIME_RANGE_OFFSET + 4))?;

    log::debug!(
        "header: channel={channel_label} scale={scale_factor} time=[{start_time_raw}, {end_time_raw}]"
    );

    Ok(SignalHeader {
        channel_label,
        scale_factor,
        start_time_raw,
        end_time_raw,
    })
}

fn seek_to<R: Seek>(src: &mut R, offset: u64, field: &str) -> Result<(), DecodeError> {
    src.seek(SeekFrom::Start(offset))
        .map(|_| ())
        .map_err(|e| DecodeError::from_header_io(e, field, offset))
}

/// Read the length-prefixed label at [`LABEL_OFFSET`] and decode it.
fn read_label_text<R: Read + Seek>(src: &mut R) -> Result<String, DecodeError> {
    seek_to(src, LABEL_OFFSET, "signal label")?;
    let char_count = src
        .read_u8()
        .map_err(|e| DecodeError::from_header_io(e, "signal label length", LABEL_OFFSET))?;

    let mut raw = vec![0u8; 2 * char_count as usize];
    src.read_exact(&mut raw)
        .map_err(|e| DecodeError::from_header_io(e, "signal label", LABEL_OFFSET + 1))?;

    decode_utf16(&raw)
}

/// Decode UTF-16 text. Big-endian unless a byte-order mark says otherwise.
pub fn decode_utf16(raw: &[u8]) -> Result<String, DecodeError> {
    if raw.len() % 2 != 0 {
        return Err(DecodeError::malformed("UTF-16 text has an odd byte count"));
    }

    let (little_endian, body) = match raw {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, raw),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let bytes = [pair[0], pair[1]];
            if little_endian {
                u16::from_le_bytes(bytes)
            } else {
                u16::from_be_bytes(bytes)
            }
        })
        .collect();

    String::from_utf16(&units)
        .map_err(|e| DecodeError::malformed(format!("signal label is not valid UTF-16: {e}")))
}

/// Extract the channel from `key=value[,extra]`: the text after the first
/// `=`, up to whitespace, up to a comma.
///
/// `"DAD1 A, Sig=254,4 Ref=off"` → `"254"`.
pub fn parse_channel_label(description: &str) -> Result<String, DecodeError> {
    let (_, value) = description.split_once('=').ok_or_else(|| {
        DecodeError::malformed(format!("signal label {description:?} has no '=' separator"))
    })?;

    let label = value
        .split_whitespace()
        .next()
        .and_then(|word| word.split(',').next())
        .unwrap_or("");

    if label.is_empty() {
        return Err(DecodeError::malformed(format!(
            "signal label {description:?} has an empty channel value"
        )));
    }
    Ok(label.to_string())
}

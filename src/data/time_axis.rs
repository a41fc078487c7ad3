use super::error::DecodeError;

/// `count` evenly spaced retention times from `start` to `end` minutes,
/// both endpoints included exactly. A single sample sits at `start`.
pub fn time_axis(start: f64, end: f64, count: usize) -> Result<Vec<f64>, DecodeError> {
    match count {
        0 => Err(DecodeError::InvalidSampleCount { count }),
        1 => Ok(vec![start]),
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut axis: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
            axis[count - 1] = end;
            Ok(axis)
        }
    }
}

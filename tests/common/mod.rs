#![allow(dead_code)]

use std::path::{Path, PathBuf};

const LABEL_OFFSET: usize = 0x1075;
const SCALE_FACTOR_OFFSET: usize = 0x127C;
const TIME_RANGE_OFFSET: usize = 0x11A;
const DATA_OFFSET: usize = 0x1800;
const ESCAPE: i16 = i16::MIN;

/// One value in a run: a plain 16-bit delta or an escaped 32-bit value.
#[derive(Debug, Clone, Copy)]
pub enum Raw {
    S(i16),
    E(i32),
}

/// Byte-level builder for a synthetic signal file.
#[derive(Debug, Clone)]
pub struct SignalFile {
    label: String,
    scale: f64,
    start: i32,
    end: i32,
    stream: Vec<u8>,
}

impl SignalFile {
    pub fn new(label: &str, scale: f64, start: i32, end: i32) -> Self {
        Self {
            label: label.to_string(),
            scale,
            start,
            end,
            stream: Vec::new(),
        }
    }

    pub fn run(mut self, values: &[Raw]) -> Self {
        self.stream.push(1);
        self.stream.push(values.len() as u8);
        for v in values {
            match *v {
                Raw::S(x) => self.stream.extend(x.to_be_bytes()),
                Raw::E(x) => {
                    self.stream.extend(ESCAPE.to_be_bytes());
                    self.stream.extend(x.to_be_bytes());
                }
            }
        }
        self
    }

    /// Append arbitrary bytes to the run stream.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.stream.extend_from_slice(bytes);
        self
    }

    pub fn terminate(self) -> Self {
        self.raw(&[0, 0])
    }

    /// Encode absolute integer counts as runs of at most 255 values.
    /// Deltas that do not fit 16 bits are stored escaped as absolute values.
    pub fn counts(mut self, counts: &[i64]) -> Self {
        let mut values = Vec::with_capacity(counts.len());
        let mut prev: Option<i64> = None;
        for &c in counts {
            let raw = match prev {
                None => match i16::try_from(c) {
                    Ok(v) if v != ESCAPE => Raw::S(v),
                    _ => Raw::E(c as i32),
                },
                Some(p) => match i16::try_from(c - p) {
                    Ok(v) if v != ESCAPE => Raw::S(v),
                    _ => Raw::E(c as i32),
                },
            };
            values.push(raw);
            prev = Some(c);
        }
        for chunk in values.chunks(255) {
            self = self.run(chunk);
        }
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; DATA_OFFSET];

        let encoded: Vec<u8> = self
            .label
            .encode_utf16()
            .flat_map(|u| u.to_be_bytes())
            .collect();
        buf[LABEL_OFFSET] = (encoded.len() / 2) as u8;
        buf[LABEL_OFFSET + 1..LABEL_OFFSET + 1 + encoded.len()].copy_from_slice(&encoded);

        buf[SCALE_FACTOR_OFFSET..SCALE_FACTOR_OFFSET + 8].copy_from_slice(&self.scale.to_be_bytes());
        buf[TIME_RANGE_OFFSET..TIME_RANGE_OFFSET + 4].copy_from_slice(&self.start.to_be_bytes());
        buf[TIME_RANGE_OFFSET + 4..TIME_RANGE_OFFSET + 8].copy_from_slice(&self.end.to_be_bytes());

        buf.extend_from_slice(&self.stream);
        buf
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.bytes()).unwrap();
    }
}

/// Lay out `<root>/<name>.D/DAD1A.ch` plus optional sidecars.
pub fn make_run_dir(
    root: &Path,
    name: &str,
    signal: &SignalFile,
    sample_xml: Option<&str>,
    report: Option<&[u8]>,
) -> PathBuf {
    let dir = root.join(format!("{name}.D"));
    std::fs::create_dir_all(&dir).unwrap();
    signal.write_to(&dir.join("DAD1A.ch"));
    if let Some(xml) = sample_xml {
        std::fs::write(dir.join("SAMPLE.XML"), xml).unwrap();
    }
    if let Some(report) = report {
        std::fs::write(dir.join("Report.TXT"), report).unwrap();
    }
    dir
}

pub fn sample_xml(name: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<Sample>\n  <Name>{name}</Name>\n  <Amount>10</Amount>\n  \
         <Multiplier>1</Multiplier>\n  <Dilution>2</Dilution>\n  <Description>from xml</Description>\n</Sample>\n"
    )
}

/// UTF-16LE with BOM, the way the instrument writes its text report.
pub fn report_txt(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    out.extend(text.encode_utf16().flat_map(|u| u.to_le_bytes()));
    out
}

pub fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - e).abs() <= 1e-9 * e.abs().max(1.0),
            "{actual:?} vs {expected:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Synthetic chromatograms
// ---------------------------------------------------------------------------

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Integer detector counts for a few peaks plus noise, `n` points over
/// `[0, 1)`.
pub fn synthetic_counts(n: usize, seed: u64) -> Vec<i64> {
    let peaks = [(0.2, 0.01, 40_000.0), (0.55, 0.03, 900_000.0), (0.8, 0.005, 12_000.0)];
    let mut rng = SimpleRng::new(seed);
    (0..n)
        .map(|i| {
            let x = i as f64 / n as f64;
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(x, mu, sigma, amp))
                .sum();
            (signal + rng.gauss(0.0, 25.0)).round() as i64
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::loader::files_matching;
use super::model::SampleMetadata;

// ---------------------------------------------------------------------------
// Provider trait and precedence
// ---------------------------------------------------------------------------

/// A source of sample metadata inside a run directory.
///
/// `Ok(None)` means the provider has nothing for this run (its file is absent
/// or carries none of the fields); the next provider is then consulted.
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn provide(&self, run_dir: &Path) -> Result<Option<SampleMetadata>>;
}

/// `SAMPLE.XML` first, then the text report.
pub fn default_providers() -> Vec<Box<dyn MetadataProvider>> {
    vec![Box::new(SampleXmlProvider), Box::new(ReportTextProvider)]
}

/// Ask each provider in order; the first non-empty answer wins. Provider
/// failures are logged and skipped, metadata is never required.
pub fn resolve_metadata(
    providers: &[Box<dyn MetadataProvider>],
    run_dir: &Path,
) -> Option<SampleMetadata> {
    for provider in providers {
        match provider.provide(run_dir) {
            Ok(Some(meta)) if !meta.is_empty() => {
                log::debug!("{}: metadata from {}", run_dir.display(), provider.name());
                return Some(meta);
            }
            Ok(_) => {}
            Err(e) => log::warn!(
                "{}: {} metadata skipped: {e:#}",
                run_dir.display(),
                provider.name()
            ),
        }
    }
    None
}

// ---------------------------------------------------------------------------
// SAMPLE.XML
// ---------------------------------------------------------------------------

/// Reads the sample sheet ChemStation writes as `*SAMPLE.XML`.
pub struct SampleXmlProvider;

impl MetadataProvider for SampleXmlProvider {
    fn name(&self) -> &'static str {
        "SAMPLE.XML"
    }

    fn provide(&self, run_dir: &Path) -> Result<Option<SampleMetadata>> {
        let found = files_matching(run_dir, |name| {
            name.to_ascii_uppercase().ends_with("SAMPLE.XML")
        })?;
        let Some(path) = found.into_iter().next() else {
            return Ok(None);
        };
        let bytes =
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let meta = parse_sample_xml(&decode_text(&bytes))
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(meta))
    }
}

/// Take the text of the root element's direct children `Name`, `Amount`,
/// `Multiplier`, `Dilution` and `Description`. Absent children stay `None`.
pub fn parse_sample_xml(text: &str) -> Result<SampleMetadata> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut meta = SampleMetadata::default();
    let mut depth = 0usize;
    let mut current: Option<XmlField> = None;

    loop {
        match reader.read_event().context("malformed XML")? {
            Event::Start(e) => {
                depth += 1;
                current = if depth == 2 {
                    XmlField::from_tag(e.name().as_ref())
                } else {
                    None
                };
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                current = None;
            }
            Event::Text(t) => {
                if let Some(field) = current {
                    let value = t.unescape().context("bad XML text")?;
                    field.set_once(&mut meta, &value);
                }
            }
            Event::CData(c) => {
                if let Some(field) = current {
                    let raw = c.into_inner();
                    field.set_once(&mut meta, &String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(meta)
}

#[derive(Debug, Clone, Copy)]
enum XmlField {
    Name,
    Amount,
    Multiplier,
    Dilution,
    Description,
}

impl XmlField {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"Name" => Some(XmlField::Name),
            b"Amount" => Some(XmlField::Amount),
            b"Multiplier" => Some(XmlField::Multiplier),
            b"Dilution" => Some(XmlField::Dilution),
            b"Description" => Some(XmlField::Description),
            _ => None,
        }
    }

    fn slot(self, meta: &mut SampleMetadata) -> &mut Option<String> {
        match self {
            XmlField::Name => &mut meta.sample_name,
            XmlField::Amount => &mut meta.sample_amount,
            XmlField::Multiplier => &mut meta.multiplier,
            XmlField::Dilution => &mut meta.dilution_factor,
            XmlField::Description => &mut meta.sample_description,
        }
    }

    fn set_once(self, meta: &mut SampleMetadata, value: &str) {
        let slot = self.slot(meta);
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Report.TXT
// ---------------------------------------------------------------------------

/// Reads the plain-text run report (`Report.TXT`) printed next to the PDF.
pub struct ReportTextProvider;

impl MetadataProvider for ReportTextProvider {
    fn name(&self) -> &'static str {
        "Report.TXT"
    }

    fn provide(&self, run_dir: &Path) -> Result<Option<SampleMetadata>> {
        let found = files_matching(run_dir, |name| name.eq_ignore_ascii_case("Report.TXT"))?;
        let Some(path) = found.into_iter().next() else {
            return Ok(None);
        };
        let bytes =
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(parse_report_text(&decode_text(&bytes)))
    }
}

/// Scan `Label : value` lines. Each label is taken from its first occurrence;
/// a missing label leaves its field `None`. Returns `None` when no known
/// label is present at all.
pub fn parse_report_text(text: &str) -> Option<SampleMetadata> {
    let mut meta = SampleMetadata::default();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let slot = match label.trim().to_ascii_lowercase().as_str() {
            "sample name" => &mut meta.sample_name,
            "sample amount" => &mut meta.sample_amount,
            "multiplier" => &mut meta.multiplier,
            "dilution" | "dilution factor" => &mut meta.dilution_factor,
            "sample info" | "description" => &mut meta.sample_description,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    (!meta.is_empty()).then_some(meta)
}

/// Decode a sidecar file: UTF-16 with a byte-order mark, else UTF-8
/// (lossy, optional BOM).
pub fn decode_text(bytes: &[u8]) -> String {
    let utf16 = |body: &[u8], le: bool| {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|p| {
                if le {
                    u16::from_le_bytes([p[0], p[1]])
                } else {
                    u16::from_be_bytes([p[0], p[1]])
                }
            })
            .collect();
        String::from_utf16_lossy(&units)
    };

    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, true),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, false),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

//! Page counting for rendered artifacts.
//!
//! `PdfPageCounter` parses the bytes and counts the page tree. When parsing is
//! unavailable or fails, `SizeEstimateCounter` derives a deliberately high
//! estimate from the byte length. `MeasuringCounter` chooses between them once
//! per run and reports which one produced each count.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Bytes per page assumed by the estimator. A full page of the sparsest content
/// the composer emits (two short lines per education entry) still serializes to
/// more than this, so the estimate errs high.
pub const DEFAULT_BYTES_PER_PAGE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountSource {
    /// Counted from the parsed page tree.
    Parsed,
    /// Derived from the artifact size.
    Estimated,
}

#[derive(Debug, Error)]
pub enum PageCountError {
    #[error("PDF could not be parsed: {0}")]
    Parse(String),

    #[error("PDF has an empty page tree")]
    NoPages,
}

pub trait PageCounter {
    fn count_pages(&self, bytes: &[u8]) -> Result<usize, PageCountError>;

    fn source(&self) -> CountSource;
}

// ────────────────────────────────────────────────────────────────────────────
// Counters
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageCounter;

impl PageCounter for PdfPageCounter {
    fn count_pages(&self, bytes: &[u8]) -> Result<usize, PageCountError> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| PageCountError::Parse(e.to_string()))?;
        match doc.get_pages().len() {
            0 => Err(PageCountError::NoPages),
            n => Ok(n),
        }
    }

    fn source(&self) -> CountSource {
        CountSource::Parsed
    }
}

/// `max(1, ceil(len / bytes_per_page))`. Never fails and never returns 0.
#[derive(Debug, Clone, Copy)]
pub struct SizeEstimateCounter {
    bytes_per_page: usize,
}

impl SizeEstimateCounter {
    pub fn new(bytes_per_page: usize) -> Self {
        Self {
            bytes_per_page: bytes_per_page.max(1),
        }
    }

    pub fn estimate(&self, bytes: &[u8]) -> usize {
        bytes.len().div_ceil(self.bytes_per_page).max(1)
    }
}

impl Default for SizeEstimateCounter {
    fn default() -> Self {
        Self::new(DEFAULT_BYTES_PER_PAGE)
    }
}

impl PageCounter for SizeEstimateCounter {
    fn count_pages(&self, bytes: &[u8]) -> Result<usize, PageCountError> {
        Ok(self.estimate(bytes))
    }

    fn source(&self) -> CountSource {
        CountSource::Estimated
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-run selection
// ────────────────────────────────────────────────────────────────────────────

/// A page count and the counter that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub pages: usize,
    pub source: CountSource,
}

/// Precise counter with a sticky fallback to the estimator.
///
/// The first measurement doubles as capability detection. Once the precise
/// path has failed, every later measurement in the same run is estimated, so a
/// run never mixes sources after a failure. Build one per run.
#[derive(Debug)]
pub struct MeasuringCounter<P = PdfPageCounter> {
    precise: P,
    estimator: SizeEstimateCounter,
    fallen_back: Cell<bool>,
}

impl MeasuringCounter<PdfPageCounter> {
    pub fn new(bytes_per_page: usize) -> Self {
        Self::with_precise(PdfPageCounter, bytes_per_page)
    }
}

impl<P: PageCounter> MeasuringCounter<P> {
    pub fn with_precise(precise: P, bytes_per_page: usize) -> Self {
        Self {
            precise,
            estimator: SizeEstimateCounter::new(bytes_per_page),
            fallen_back: Cell::new(false),
        }
    }

    pub fn measure(&self, bytes: &[u8]) -> Measurement {
        if !self.fallen_back.get() {
            match self.precise.count_pages(bytes) {
                Ok(pages) => {
                    return Measurement {
                        pages,
                        source: self.precise.source(),
                    }
                }
                Err(e) => {
                    warn!(
                        "Precise page count failed ({e}); using size estimate for the rest of this run"
                    );
                    self.fallen_back.set(true);
                }
            }
        }
        Measurement {
            pages: self.estimator.estimate(bytes),
            source: CountSource::Estimated,
        }
    }
}

impl<P: PageCounter> PageCounter for MeasuringCounter<P> {
    fn count_pages(&self, bytes: &[u8]) -> Result<usize, PageCountError> {
        Ok(self.measure(bytes).pages)
    }

    fn source(&self) -> CountSource {
        if self.fallen_back.get() {
            CountSource::Estimated
        } else {
            self.precise.source()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::renderer::render;
    use crate::layout::style::{PageSize, StyleFloors, StyleParameters};
    use crate::models::{
        CertificationEntry, EducationEntry, ExperienceEntry, OmittedCounts, ResumeDocument,
    };

    /// Fails on every call, like a build without a usable parser.
    struct BrokenCounter;

    impl PageCounter for BrokenCounter {
        fn count_pages(&self, _bytes: &[u8]) -> Result<usize, PageCountError> {
            Err(PageCountError::Parse("parser unavailable".to_string()))
        }

        fn source(&self) -> CountSource {
            CountSource::Parsed
        }
    }

    fn rendered_pdf() -> Vec<u8> {
        let doc = ResumeDocument {
            name: "Jane Doe".to_string(),
            contact_line: String::new(),
            summary: "Engineer.".to_string(),
            experience: vec![],
            skills: vec![],
            projects: vec![],
            certifications: vec![],
            education: vec![],
            omitted: OmittedCounts::default(),
        };
        render(&doc, &StyleParameters::default(), PageSize::Letter)
            .unwrap()
            .bytes
    }

    #[test]
    fn test_pdf_counter_counts_rendered_pages() {
        assert_eq!(PdfPageCounter.count_pages(&rendered_pdf()).unwrap(), 1);
    }

    #[test]
    fn test_pdf_counter_rejects_garbage() {
        assert!(PdfPageCounter.count_pages(b"not a pdf").is_err());
    }

    #[test]
    fn test_estimator_never_returns_zero() {
        let est = SizeEstimateCounter::default();
        assert_eq!(est.estimate(&[]), 1);
        assert_eq!(est.estimate(&[0u8; DEFAULT_BYTES_PER_PAGE]), 1);
        assert_eq!(est.estimate(&[0u8; DEFAULT_BYTES_PER_PAGE + 1]), 2);
    }

    #[test]
    fn test_zero_bytes_per_page_is_clamped() {
        assert_eq!(SizeEstimateCounter::new(0).estimate(&[0u8; 3]), 3);
    }

    #[test]
    fn test_measuring_counter_prefers_parsed() {
        let counter = MeasuringCounter::new(DEFAULT_BYTES_PER_PAGE);
        let m = counter.measure(&rendered_pdf());
        assert_eq!(m.source, CountSource::Parsed);
        assert_eq!(m.pages, 1);
    }

    #[test]
    fn test_measuring_counter_falls_back_and_stays_estimated() {
        let counter = MeasuringCounter::with_precise(BrokenCounter, 100);
        let first = counter.measure(&[0u8; 250]);
        assert_eq!(first.source, CountSource::Estimated);
        assert_eq!(first.pages, 3);
        let second = counter.measure(&[0u8; 50]);
        assert_eq!(second.source, CountSource::Estimated);
        assert_eq!(counter.source(), CountSource::Estimated);
    }

    #[test]
    fn test_fallback_is_sticky_even_if_later_bytes_parse() {
        let counter = MeasuringCounter::with_precise(PdfPageCounter, DEFAULT_BYTES_PER_PAGE);
        assert_eq!(counter.measure(b"garbage").source, CountSource::Estimated);
        assert_eq!(counter.measure(&rendered_pdf()).source, CountSource::Estimated);
    }

    fn floor_style() -> StyleParameters {
        let floors = StyleFloors::default();
        StyleParameters {
            font_size_pt: floors.font_size_pt,
            margin_in: floors.margin_in,
            line_spacing: floors.line_spacing,
        }
    }

    /// One short line per certification: the densest page content there is.
    fn certification_doc(count: usize) -> ResumeDocument {
        ResumeDocument {
            name: "Jane Doe".to_string(),
            contact_line: String::new(),
            summary: String::new(),
            experience: vec![],
            skills: vec![],
            projects: vec![],
            certifications: (0..count)
                .map(|i| CertificationEntry {
                    name: format!("C{i}"),
                    issuer: None,
                    year: None,
                    relevance_score: None,
                })
                .collect(),
            education: vec![],
            omitted: OmittedCounts::default(),
        }
    }

    fn bullet_doc(bullets: usize) -> ResumeDocument {
        let mut doc = certification_doc(0);
        doc.experience = vec![ExperienceEntry {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            duration: "2020-2024".to_string(),
            bullets: (0..bullets)
                .map(|i| format!("Improved ingestion pipeline {i} throughput with Rust and SQL"))
                .collect(),
            relevance_score: None,
        }];
        doc
    }

    fn education_doc(count: usize) -> ResumeDocument {
        let mut doc = certification_doc(0);
        doc.education = (0..count)
            .map(|_| EducationEntry {
                degree: "BSc Computer Science".to_string(),
                institution: "State University".to_string(),
                year: Some("2019".to_string()),
                gpa: None,
                relevance_score: None,
            })
            .collect();
        doc
    }

    #[test]
    fn test_estimate_never_under_counts_rendered_output() {
        let docs: Vec<ResumeDocument> = [40, 60, 120, 200, 400]
            .into_iter()
            .map(certification_doc)
            .chain([30, 120, 300].into_iter().map(bullet_doc))
            .chain([25, 80, 200].into_iter().map(education_doc))
            .collect();
        let estimator = SizeEstimateCounter::default();

        for doc in &docs {
            for style in [StyleParameters::default(), floor_style()] {
                for page_size in [PageSize::Letter, PageSize::A4] {
                    let bytes = render(doc, &style, page_size).unwrap().bytes;
                    let real = PdfPageCounter.count_pages(&bytes).unwrap();
                    let estimated = estimator.estimate(&bytes);
                    assert!(
                        estimated >= real,
                        "estimated {estimated} < real {real} ({} bytes, {style:?}, {page_size})",
                        bytes.len()
                    );
                }
            }
        }
    }
}

//! Composition: turns a `ResumeDocument` into positioned lines on pages.
//!
//! Two phases:
//! 1. `build_blocks`: every piece of content becomes a block of wrapped lines.
//!    Entry blocks (experience, project, certification, education) are
//!    keep-together; a section heading is folded into the front of the first
//!    block of its section so it always travels with it.
//! 2. `paginate`: blocks are poured onto pages top to bottom.
//!
//! Composition never fails and never produces bytes; `estimate_pages` uses it
//! directly to size content before anything is rendered.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{get_metrics, FontFace};
use crate::layout::line_breaker::wrap_text;
use crate::layout::style::{PageSize, StyleParameters, Typography};
use crate::models::resume::join_present;
use crate::models::{ResumeDocument, SectionKind};

const SKILL_SEPARATOR: &str = " • ";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    Left,
    Center,
}

/// One line of text before it is placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub face: FontFace,
    pub size_pt: f32,
    /// Horizontal offset from the left margin (ignored for centered lines).
    pub indent_pt: f32,
    pub align: Align,
    /// Bullet glyph drawn in the hanging indent of the first line of a bullet.
    pub bullet: bool,
    /// Horizontal rule drawn under the line (section headings).
    pub rule_below: bool,
    /// Gap above the line. Dropped when the line opens a page.
    pub space_before_pt: f32,
    pub leading_pt: f32,
}

impl Line {
    fn height(&self, at_page_top: bool) -> f32 {
        if at_page_top {
            self.leading_pt
        } else {
            self.space_before_pt + self.leading_pt
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub lines: Vec<Line>,
    /// Never split across pages when the block fits on one page.
    pub keep_together: bool,
    /// Lines at the front that must share a page with the line after them
    /// (a section heading kept with its first content line).
    pub lead_lines: usize,
}

impl Block {
    fn height(&self, at_page_top: bool) -> f32 {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, l)| l.height(at_page_top && i == 0))
            .sum()
    }

    /// Height of the lead lines plus the first line after them.
    fn lead_height(&self, at_page_top: bool) -> f32 {
        self.lines
            .iter()
            .take(self.lead_lines + 1)
            .enumerate()
            .map(|(i, l)| l.height(at_page_top && i == 0))
            .sum()
    }
}

/// A line with its vertical position: `top_pt` is measured down from the top
/// of the content area to the top of the line box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub line: Line,
    pub top_pt: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedPage {
    pub lines: Vec<PlacedLine>,
    /// Height consumed by content on this page.
    pub used_pt: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedDocument {
    pub pages: Vec<ComposedPage>,
    pub typography: Typography,
}

impl ComposedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

pub fn compose(
    doc: &ResumeDocument,
    style: &StyleParameters,
    page_size: PageSize,
) -> ComposedDocument {
    let typography = Typography::new(style, page_size);
    let blocks = build_blocks(doc, &typography);
    let pages = paginate(&blocks, typography.content_height());
    ComposedDocument { pages, typography }
}

/// Pages the document would occupy, without producing any bytes.
pub fn estimate_pages(doc: &ResumeDocument, style: &StyleParameters, page_size: PageSize) -> usize {
    compose(doc, style, page_size).page_count()
}

// ────────────────────────────────────────────────────────────────────────────
// Block building
// ────────────────────────────────────────────────────────────────────────────

/// Accumulates lines for one block with the shared typography.
struct BlockBuilder<'a> {
    t: &'a Typography,
    lines: Vec<Line>,
    next_space: f32,
}

impl<'a> BlockBuilder<'a> {
    fn new(t: &'a Typography, space_before: f32) -> Self {
        Self {
            t,
            lines: Vec::new(),
            next_space: space_before,
        }
    }

    fn push_line(&mut self, text: String, face: FontFace, size_pt: f32, indent_pt: f32, align: Align) {
        self.lines.push(Line {
            text,
            face,
            size_pt,
            indent_pt,
            align,
            bullet: false,
            rule_below: false,
            space_before_pt: std::mem::take(&mut self.next_space),
            leading_pt: self.t.leading(size_pt),
        });
    }

    /// Wraps a paragraph at the full text width (minus `indent_pt`).
    fn paragraph(&mut self, text: &str, face: FontFace, size_pt: f32, indent_pt: f32, align: Align) {
        let width = self.t.text_width() - indent_pt;
        for line in wrap_text(text, get_metrics(face), size_pt, width) {
            self.push_line(line, face, size_pt, indent_pt, align);
        }
    }

    /// A bulleted item with a hanging indent; continuation lines align with the text.
    fn bullet(&mut self, text: &str) {
        let size = self.t.body_size;
        let indent = self.t.bullet_indent;
        let width = self.t.text_width() - indent;
        let first = self.lines.len();
        for line in wrap_text(text, get_metrics(FontFace::Regular), size, width) {
            self.push_line(line, FontFace::Regular, size, indent, Align::Left);
        }
        if let Some(line) = self.lines.get_mut(first) {
            line.bullet = true;
        }
    }

    fn heading(&mut self, text: &str) {
        let size = self.t.heading_size;
        self.paragraph(text, FontFace::Bold, size, 0.0, Align::Left);
        if let Some(last) = self.lines.last_mut() {
            last.rule_below = true;
        }
        self.next_space = self.t.heading_space_after();
    }

    fn finish(self, keep_together: bool, lead_lines: usize) -> Option<Block> {
        if self.lines.is_empty() {
            return None;
        }
        Some(Block {
            lines: self.lines,
            keep_together,
            lead_lines,
        })
    }
}

/// Builds every block of the document in display order.
pub fn build_blocks(doc: &ResumeDocument, t: &Typography) -> Vec<Block> {
    let mut blocks = Vec::new();

    // Header: name and contact line, centered.
    let mut header = BlockBuilder::new(t, 0.0);
    header.paragraph(&doc.name, FontFace::Bold, t.name_size, 0.0, Align::Center);
    header.paragraph(&doc.contact_line, FontFace::Regular, t.body_size, 0.0, Align::Center);
    blocks.extend(header.finish(true, 0));

    if !doc.summary.trim().is_empty() {
        let mut summary = BlockBuilder::new(t, t.heading_space_before());
        summary.heading("PROFESSIONAL SUMMARY");
        let lead = summary.lines.len();
        summary.paragraph(&doc.summary, FontFace::Regular, t.body_size, 0.0, Align::Left);
        blocks.extend(summary.finish(false, lead));
    }

    for section in SectionKind::ALL {
        if doc.section_len(section) == 0 {
            continue;
        }
        blocks.extend(section_blocks(doc, section, t));
    }

    blocks
}

fn section_blocks(doc: &ResumeDocument, section: SectionKind, t: &Typography) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut heading = Some(section.heading());

    match section {
        SectionKind::Experience => {
            for e in &doc.experience {
                let (mut b, lead) = open_block(t, &mut heading, t.entry_gap());
                b.paragraph(&e.title, FontFace::Bold, t.entry_title_size, 0.0, Align::Left);
                let sub = join_present(&[&e.company, &e.duration], " | ");
                b.paragraph(&sub, FontFace::Oblique, t.body_size, 0.0, Align::Left);
                for bullet in &e.bullets {
                    b.bullet(bullet);
                }
                blocks.extend(b.finish(true, lead));
            }
        }
        SectionKind::Skills => {
            let (mut b, lead) = open_block(t, &mut heading, 0.0);
            for line in skill_lines(doc) {
                b.paragraph(&line, FontFace::Regular, t.body_size, 0.0, Align::Left);
            }
            blocks.extend(b.finish(false, lead));
        }
        SectionKind::Projects => {
            for p in &doc.projects {
                let (mut b, lead) = open_block(t, &mut heading, t.entry_gap());
                b.paragraph(&p.name, FontFace::Bold, t.entry_title_size, 0.0, Align::Left);
                for bullet in &p.bullets {
                    b.bullet(bullet);
                }
                if !p.technologies.is_empty() {
                    let tech = format!("Technologies: {}", p.technologies.join(", "));
                    b.paragraph(&tech, FontFace::Oblique, t.body_size, 0.0, Align::Left);
                }
                blocks.extend(b.finish(true, lead));
            }
        }
        SectionKind::Certifications => {
            for c in &doc.certifications {
                let (mut b, lead) = open_block(t, &mut heading, 0.0);
                let text = join_present(
                    &[
                        &c.name,
                        c.issuer.as_deref().unwrap_or(""),
                        c.year.as_deref().unwrap_or(""),
                    ],
                    " | ",
                );
                b.bullet(&text);
                blocks.extend(b.finish(true, lead));
            }
        }
        SectionKind::Education => {
            for e in &doc.education {
                let (mut b, lead) = open_block(t, &mut heading, t.entry_gap());
                let title = if e.degree.trim().is_empty() {
                    &e.institution
                } else {
                    &e.degree
                };
                b.paragraph(title, FontFace::Bold, t.entry_title_size, 0.0, Align::Left);
                let gpa = e.gpa.as_deref().map(|g| format!("GPA: {g}")).unwrap_or_default();
                let institution = if e.degree.trim().is_empty() {
                    ""
                } else {
                    e.institution.as_str()
                };
                let sub = join_present(&[institution, e.year.as_deref().unwrap_or(""), &gpa], " | ");
                b.paragraph(&sub, FontFace::Oblique, t.body_size, 0.0, Align::Left);
                blocks.extend(b.finish(true, lead));
            }
        }
    }

    if doc.omitted.get(section) > 0 {
        let mut note = BlockBuilder::new(t, t.entry_gap());
        note.paragraph(section.omission_note(), FontFace::Oblique, t.body_size, 0.0, Align::Left);
        blocks.extend(note.finish(true, 0));
    }

    blocks
}

/// Opens a block; the first block of a section carries the heading as lead lines.
fn open_block<'a>(
    t: &'a Typography,
    heading: &mut Option<&str>,
    gap: f32,
) -> (BlockBuilder<'a>, usize) {
    match heading.take() {
        Some(text) => {
            let mut b = BlockBuilder::new(t, t.heading_space_before());
            b.heading(text);
            let lead = b.lines.len();
            (b, lead)
        }
        None => (BlockBuilder::new(t, gap), 0),
    }
}

/// Skills grouped by category in first-seen order, or one `•`-separated run.
fn skill_lines(doc: &ResumeDocument) -> Vec<String> {
    if doc.skills.iter().all(|s| s.category.is_none()) {
        let names: Vec<&str> = doc.skills.iter().map(|s| s.name.trim()).collect();
        return vec![names.join(SKILL_SEPARATOR)];
    }

    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for skill in &doc.skills {
        let category = skill.category.as_deref().unwrap_or("Other").trim();
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, names)) => names.push(skill.name.trim()),
            None => groups.push((category, vec![skill.name.trim()])),
        }
    }
    groups
        .into_iter()
        .map(|(category, names)| format!("{category}: {}", names.join(", ")))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

/// Pours blocks onto pages of `page_height` points of content area.
///
/// Rules:
/// - A keep-together block that fits on the current page is placed whole
/// - One that does not fit moves to a fresh page if it fits a page on its own
/// - Anything else flows line by line, breaking only between its lines, after
///   first making sure its lead lines share a page with the next line
/// - The gap above the first line of a page is dropped
pub fn paginate(blocks: &[Block], page_height: f32) -> Vec<ComposedPage> {
    let mut pages: Vec<ComposedPage> = vec![ComposedPage::default()];

    for block in blocks {
        let current_empty = pages.last().map_or(true, |p| p.lines.is_empty());
        let remaining = page_height - pages.last().map_or(0.0, |p| p.used_pt);

        if block.keep_together {
            if block.height(current_empty) <= remaining {
                place_lines(&mut pages, &block.lines, page_height);
                continue;
            }
            if !current_empty && block.height(true) <= page_height {
                pages.push(ComposedPage::default());
                place_lines(&mut pages, &block.lines, page_height);
                continue;
            }
        }

        if !current_empty && block.lead_height(false) > remaining {
            pages.push(ComposedPage::default());
        }
        place_lines(&mut pages, &block.lines, page_height);
    }

    pages.retain(|p| !p.lines.is_empty());
    if pages.is_empty() {
        pages.push(ComposedPage::default());
    }
    pages
}

/// Places lines one at a time, opening a new page whenever the next line
/// would overflow. A line taller than a whole page still goes on its own page.
fn place_lines(pages: &mut Vec<ComposedPage>, lines: &[Line], page_height: f32) {
    for line in lines {
        let needs_break = match pages.last() {
            Some(page) => {
                !page.lines.is_empty() && page.used_pt + line.height(false) > page_height
            }
            None => true,
        };
        if needs_break {
            pages.push(ComposedPage::default());
        }
        let Some(page) = pages.last_mut() else {
            return;
        };
        let at_top = page.lines.is_empty();
        let top_pt = page.used_pt + if at_top { 0.0 } else { line.space_before_pt };
        page.used_pt = top_pt + line.leading_pt;
        page.lines.push(PlacedLine {
            line: line.clone(),
            top_pt,
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExperienceEntry, OmittedCounts, SkillEntry};

    fn line(text: &str, space_before: f32, leading: f32) -> Line {
        Line {
            text: text.to_string(),
            face: FontFace::Regular,
            size_pt: 10.0,
            indent_pt: 0.0,
            align: Align::Left,
            bullet: false,
            rule_below: false,
            space_before_pt: space_before,
            leading_pt: leading,
        }
    }

    fn block(n: usize, keep_together: bool) -> Block {
        Block {
            lines: (0..n).map(|i| line(&format!("l{i}"), 0.0, 10.0)).collect(),
            keep_together,
            lead_lines: 0,
        }
    }

    fn experience(title: &str, bullets: usize) -> ExperienceEntry {
        ExperienceEntry {
            title: title.to_string(),
            company: "Acme".to_string(),
            duration: "2020-2023".to_string(),
            bullets: (0..bullets)
                .map(|i| format!("Delivered improvement number {i} across the platform"))
                .collect(),
            relevance_score: None,
        }
    }

    fn make_doc(experiences: usize, bullets: usize) -> ResumeDocument {
        ResumeDocument {
            name: "Jane Doe".to_string(),
            contact_line: "jane@example.com | 555-0100".to_string(),
            summary: "Backend engineer with a focus on data systems.".to_string(),
            experience: (0..experiences)
                .map(|i| experience(&format!("Engineer {i}"), bullets))
                .collect(),
            skills: vec![SkillEntry {
                name: "Rust".to_string(),
                category: None,
                relevance_score: None,
            }],
            projects: vec![],
            certifications: vec![],
            education: vec![],
            omitted: OmittedCounts::default(),
        }
    }

    fn all_text(composed: &ComposedDocument) -> Vec<String> {
        composed
            .pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.line.text.clone()))
            .collect()
    }

    #[test]
    fn test_keep_together_block_moves_to_next_page() {
        let blocks = vec![block(7, true), block(5, true)];
        let pages = paginate(&blocks, 100.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 7);
        assert_eq!(pages[1].lines.len(), 5);
    }

    #[test]
    fn test_splittable_block_fills_page() {
        let blocks = vec![block(7, true), block(5, false)];
        let pages = paginate(&blocks, 100.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 10);
        assert_eq!(pages[1].lines.len(), 2);
    }

    #[test]
    fn test_oversized_block_splits_at_line_boundaries() {
        let blocks = vec![block(25, true)];
        let pages = paginate(&blocks, 100.0);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.used_pt <= 100.0));
    }

    #[test]
    fn test_lead_lines_stay_with_following_line() {
        let mut heading_block = block(3, false);
        heading_block.lead_lines = 1;
        let blocks = vec![block(9, true), heading_block];
        let pages = paginate(&blocks, 100.0);
        // Heading + first line need 20pt; only 10pt remain.
        assert_eq!(pages[0].lines.len(), 9);
        assert_eq!(pages[1].lines[0].line.text, "l0");
        assert_eq!(pages[1].lines.len(), 3);
    }

    #[test]
    fn test_space_before_dropped_at_page_top() {
        let blocks = vec![
            block(10, true),
            Block {
                lines: vec![line("gap", 6.0, 10.0)],
                keep_together: true,
                lead_lines: 0,
            },
        ];
        let pages = paginate(&blocks, 100.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].lines[0].top_pt, 0.0);
        assert_eq!(pages[1].used_pt, 10.0);
    }

    #[test]
    fn test_empty_input_is_one_page() {
        assert_eq!(paginate(&[], 100.0).len(), 1);
    }

    #[test]
    fn test_small_document_is_one_page() {
        let doc = make_doc(2, 2);
        assert_eq!(estimate_pages(&doc, &StyleParameters::default(), PageSize::Letter), 1);
    }

    #[test]
    fn test_large_document_spans_pages() {
        let doc = make_doc(20, 6);
        assert!(estimate_pages(&doc, &StyleParameters::default(), PageSize::Letter) >= 2);
    }

    #[test]
    fn test_smaller_style_never_needs_more_pages() {
        let doc = make_doc(12, 5);
        let default = estimate_pages(&doc, &StyleParameters::default(), PageSize::Letter);
        let tight = StyleParameters {
            font_size_pt: 9.0,
            margin_in: 0.5,
            line_spacing: 1.0,
        };
        assert!(estimate_pages(&doc, &tight, PageSize::Letter) <= default);
    }

    #[test]
    fn test_entry_never_split_when_it_fits() {
        let doc = make_doc(14, 5);
        let composed = compose(&doc, &StyleParameters::default(), PageSize::Letter);
        assert!(composed.page_count() >= 2);
        // Every page opens with an entry title, never with a sub-line or bullet.
        for page in &composed.pages[1..] {
            let first = &page.lines[0].line.text;
            assert!(
                first.starts_with("Engineer") || first == SectionKind::Skills.heading(),
                "page opens mid-entry: {first}"
            );
        }
    }

    #[test]
    fn test_heading_never_ends_a_page() {
        let doc = make_doc(14, 5);
        let composed = compose(&doc, &StyleParameters::default(), PageSize::Letter);
        for page in &composed.pages {
            let last = page.lines.last().expect("pages are non-empty");
            assert!(!last.line.rule_below, "heading '{}' stranded", last.line.text);
        }
    }

    #[test]
    fn test_omission_note_rendered_once_per_section() {
        let mut doc = make_doc(1, 1);
        doc.omitted.experience = 3;
        let composed = compose(&doc, &StyleParameters::default(), PageSize::Letter);
        let notes = all_text(&composed)
            .into_iter()
            .filter(|t| t == SectionKind::Experience.omission_note())
            .count();
        assert_eq!(notes, 1);
    }

    #[test]
    fn test_skills_grouped_by_category() {
        let mut doc = make_doc(1, 1);
        doc.skills = vec![
            SkillEntry {
                name: "Rust".to_string(),
                category: Some("Languages".to_string()),
                relevance_score: None,
            },
            SkillEntry {
                name: "Postgres".to_string(),
                category: Some("Databases".to_string()),
                relevance_score: None,
            },
            SkillEntry {
                name: "Go".to_string(),
                category: Some("Languages".to_string()),
                relevance_score: None,
            },
        ];
        assert_eq!(
            skill_lines(&doc),
            vec!["Languages: Rust, Go".to_string(), "Databases: Postgres".to_string()]
        );
    }

    #[test]
    fn test_first_bullet_line_is_marked() {
        let doc = make_doc(1, 1);
        let composed = compose(&doc, &StyleParameters::default(), PageSize::Letter);
        let bullet_lines: Vec<_> = composed.pages[0]
            .lines
            .iter()
            .filter(|l| l.line.bullet)
            .collect();
        assert_eq!(bullet_lines.len(), 1);
        assert!(bullet_lines[0].line.indent_pt > 0.0);
    }
}

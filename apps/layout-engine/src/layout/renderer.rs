//! PDF writer: serializes a composed document with `lopdf`.
//!
//! Output is byte-identical for identical input: object ids are allocated in a
//! fixed order, coordinates are rounded to 1/100 pt, and neither a creation date
//! nor a document id is written.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::errors::LayoutError;
use crate::layout::composer::{compose, Align, ComposedDocument, PlacedLine};
use crate::layout::font_metrics::{get_metrics, FontFace};
use crate::layout::style::{PageSize, StyleParameters, Typography};
use crate::models::ResumeDocument;

/// Rule thickness under section headings.
const RULE_WIDTH_PT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// Pages the composer laid out. The controller compares this with the
    /// parsed count and logs any disagreement at debug level.
    pub laid_out_pages: usize,
}

/// Lays out and serializes `doc`.
///
/// Fails with `LayoutError::Render` when any text cannot be encoded in
/// WinAnsi or the PDF cannot be serialized.
pub fn render(
    doc: &ResumeDocument,
    style: &StyleParameters,
    page_size: PageSize,
) -> Result<RenderedDocument, LayoutError> {
    let composed = compose(doc, style, page_size);
    let bytes = write_pdf(&composed, &doc.name)?;
    debug!(
        pages = composed.page_count(),
        bytes = bytes.len(),
        "Rendered document"
    );
    Ok(RenderedDocument {
        bytes,
        laid_out_pages: composed.page_count(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────────────────

/// Encodes text as WinAnsi (PDF 1.7 Annex D) bytes.
///
/// Tab and newline are accepted and written as spaces. Any other control
/// character or any character outside the encoding is an error.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, LayoutError> {
    text.chars()
        .map(|c| {
            win_ansi_byte(c).ok_or_else(|| {
                LayoutError::Render(format!(
                    "character {c:?} (U+{:04X}) cannot be encoded in WinAnsi",
                    c as u32
                ))
            })
        })
        .collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match c {
        '\t' | '\n' => Some(b' '),
        ' '..='~' => Some(code as u8),
        '\u{A0}'..='\u{FF}' => Some(code as u8),
        '€' => Some(0x80),
        '‚' => Some(0x82),
        'ƒ' => Some(0x83),
        '„' => Some(0x84),
        '…' => Some(0x85),
        '†' => Some(0x86),
        '‡' => Some(0x87),
        'ˆ' => Some(0x88),
        '‰' => Some(0x89),
        'Š' => Some(0x8A),
        '‹' => Some(0x8B),
        'Œ' => Some(0x8C),
        'Ž' => Some(0x8E),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '•' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '˜' => Some(0x98),
        '™' => Some(0x99),
        'š' => Some(0x9A),
        '›' => Some(0x9B),
        'œ' => Some(0x9C),
        'ž' => Some(0x9E),
        'Ÿ' => Some(0x9F),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF assembly
// ────────────────────────────────────────────────────────────────────────────

fn write_pdf(composed: &ComposedDocument, title: &str) -> Result<Vec<u8>, LayoutError> {
    let t = &composed.typography;
    let mut pdf = Document::with_version("1.5");
    let pages_id = pdf.new_object_id();

    let mut fonts = Dictionary::new();
    for face in FontFace::ALL {
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), font_id);
    }
    let resources_id = pdf.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::with_capacity(composed.pages.len());
    for page in &composed.pages {
        let content = page_content(&page.lines, t)?;
        let encoded = content
            .encode()
            .map_err(|e| LayoutError::Render(format!("content stream encoding failed: {e}")))?;
        let content_id = pdf.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                real(t.page_width),
                real(t.page_height),
            ],
        }),
    );

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = pdf.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title)?, StringFormat::Literal),
        "Producer" => Object::string_literal("layout-engine"),
    });
    pdf.trailer.set("Root", catalog_id);
    pdf.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes)
        .map_err(|e| LayoutError::Render(format!("PDF serialization failed: {e}")))?;
    Ok(bytes)
}

/// Builds the content stream for one page.
fn page_content(lines: &[PlacedLine], t: &Typography) -> Result<Content, LayoutError> {
    let mut operations = Vec::new();

    for placed in lines {
        let line = &placed.line;
        let text = encode_win_ansi(&line.text)?;
        let baseline = baseline_y(placed, t);

        let x = match line.align {
            Align::Left => t.margin + line.indent_pt,
            Align::Center => {
                let width = get_metrics(line.face).measure_pt(&line.text, line.size_pt);
                ((t.page_width - width) / 2.0).max(t.margin)
            }
        };

        if line.bullet {
            let bullet_x = t.margin + line.indent_pt - t.bullet_indent + 0.25 * line.size_pt;
            push_text(
                &mut operations,
                FontFace::Regular,
                line.size_pt,
                bullet_x,
                baseline,
                vec![0x95],
            );
        }

        push_text(&mut operations, line.face, line.size_pt, x, baseline, text);

        if line.rule_below {
            let y = baseline - 0.3 * line.size_pt;
            operations.push(Operation::new("w", vec![real(RULE_WIDTH_PT)]));
            operations.push(Operation::new("m", vec![real(t.margin), real(y)]));
            operations.push(Operation::new(
                "l",
                vec![real(t.page_width - t.margin), real(y)],
            ));
            operations.push(Operation::new("S", vec![]));
        }
    }

    Ok(Content { operations })
}

fn push_text(
    operations: &mut Vec<Operation>,
    face: FontFace,
    size_pt: f32,
    x: f32,
    y: f32,
    text: Vec<u8>,
) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![face.resource_name().into(), real(size_pt)],
    ));
    operations.push(Operation::new("Td", vec![real(x), real(y)]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(text, StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}

/// PDF y of a line's baseline. The glyph box is centered in the leading and
/// the baseline sits 80% of the way down the glyph box.
fn baseline_y(placed: &PlacedLine, t: &Typography) -> f32 {
    let line = &placed.line;
    let half_gap = (line.leading_pt - line.size_pt) / 2.0;
    t.page_height - t.margin - placed.top_pt - half_gap - 0.8 * line.size_pt
}

fn real(v: f32) -> Object {
    Object::Real(((v * 100.0).round() / 100.0).into())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExperienceEntry, OmittedCounts};

    fn make_doc(name: &str, bullets: usize) -> ResumeDocument {
        ResumeDocument {
            name: name.to_string(),
            contact_line: "jane@example.com | 555-0100".to_string(),
            summary: "Data engineer building reliable pipelines.".to_string(),
            experience: vec![ExperienceEntry {
                title: "Data Engineer".to_string(),
                company: "Acme (Analytics)".to_string(),
                duration: "2020-2024".to_string(),
                bullets: (0..bullets)
                    .map(|i| format!("Shipped pipeline improvement {i} with Python and SQL"))
                    .collect(),
                relevance_score: None,
            }],
            skills: vec![],
            projects: vec![],
            certifications: vec![],
            education: vec![],
            omitted: OmittedCounts::default(),
        }
    }

    #[test]
    fn test_render_produces_parseable_pdf() {
        let out = render(&make_doc("Jane Doe", 3), &StyleParameters::default(), PageSize::Letter)
            .unwrap();
        assert!(out.bytes.starts_with(b"%PDF-1.5"));
        let parsed = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), out.laid_out_pages);
        assert_eq!(out.laid_out_pages, 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = make_doc("Jane Doe", 40);
        let style = StyleParameters::default();
        let a = render(&doc, &style, PageSize::A4).unwrap();
        let b = render(&doc, &style, PageSize::A4).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_multi_page_document_page_tree_matches_layout() {
        let out = render(&make_doc("Jane Doe", 120), &StyleParameters::default(), PageSize::Letter)
            .unwrap();
        assert!(out.laid_out_pages >= 2);
        let parsed = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), out.laid_out_pages);
    }

    #[test]
    fn test_latin1_and_typographic_characters_render() {
        let mut doc = make_doc("José Müller", 1);
        doc.summary = "Résumé \u{2013} “quoted” • 5€".to_string();
        assert!(render(&doc, &StyleParameters::default(), PageSize::Letter).is_ok());
    }

    #[test]
    fn test_unencodable_character_is_render_failure() {
        let doc = make_doc("山田太郎", 1);
        let err = render(&doc, &StyleParameters::default(), PageSize::Letter).unwrap_err();
        assert!(err.is_render_failure());
    }

    #[test]
    fn test_control_character_is_render_failure() {
        let mut doc = make_doc("Jane Doe", 1);
        doc.summary = "bell\u{7}here".to_string();
        let err = render(&doc, &StyleParameters::default(), PageSize::Letter).unwrap_err();
        assert!(err.is_render_failure());
    }

    #[test]
    fn test_encode_win_ansi_maps_bullet_and_latin1() {
        assert_eq!(encode_win_ansi("•é").unwrap(), vec![0x95, 0xE9]);
        assert_eq!(encode_win_ansi("a\tb").unwrap(), b"a b".to_vec());
    }
}

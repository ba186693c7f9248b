//! Style parameters, their floors and step sizes, and the typography derived from them.
//!
//! `StyleParameters` is an immutable `Copy` value. Each shrink returns a new value
//! and never goes below its floor, so a run's styles are monotonically
//! non-increasing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Points per inch.
pub const PT_PER_IN: f32 = 72.0;

// ────────────────────────────────────────────────────────────────────────────
// Style parameters
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleParameters {
    pub font_size_pt: f32,
    /// Uniform page margin, in inches.
    pub margin_in: f32,
    /// Leading multiplier applied to every font size.
    pub line_spacing: f32,
}

impl Default for StyleParameters {
    fn default() -> Self {
        Self {
            font_size_pt: 10.0,
            margin_in: 0.75,
            line_spacing: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleFloors {
    pub font_size_pt: f32,
    pub margin_in: f32,
    pub line_spacing: f32,
}

impl Default for StyleFloors {
    fn default() -> Self {
        Self {
            font_size_pt: 9.0,
            margin_in: 0.5,
            line_spacing: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleSteps {
    pub font_size_pt: f32,
    pub margin_in: f32,
    pub line_spacing: f32,
}

impl Default for StyleSteps {
    fn default() -> Self {
        Self {
            font_size_pt: 0.5,
            margin_in: 0.1,
            line_spacing: 0.05,
        }
    }
}

impl StyleParameters {
    /// Raises every value to at least its floor.
    pub fn clamped_to(self, floors: &StyleFloors) -> Self {
        Self {
            font_size_pt: self.font_size_pt.max(floors.font_size_pt),
            margin_in: self.margin_in.max(floors.margin_in),
            line_spacing: self.line_spacing.max(floors.line_spacing),
        }
    }

    pub fn respects(&self, floors: &StyleFloors) -> bool {
        self.font_size_pt >= floors.font_size_pt
            && self.margin_in >= floors.margin_in
            && self.line_spacing >= floors.line_spacing
    }

    pub fn shrink_font(self, step: f32, floor: f32) -> Option<Self> {
        step_down(self.font_size_pt, step, floor).map(|font_size_pt| Self {
            font_size_pt,
            ..self
        })
    }

    pub fn shrink_margin(self, step: f32, floor: f32) -> Option<Self> {
        step_down(self.margin_in, step, floor).map(|margin_in| Self { margin_in, ..self })
    }

    pub fn shrink_line_spacing(self, step: f32, floor: f32) -> Option<Self> {
        step_down(self.line_spacing, step, floor).map(|line_spacing| Self {
            line_spacing,
            ..self
        })
    }
}

/// One step toward `floor`. `None` once the value is already at the floor.
///
/// Results are rounded to 1/1000 so repeated `f32` subtraction cannot drift
/// below the floor or leave a sliver just above it.
pub fn step_down(value: f32, step: f32, floor: f32) -> Option<f32> {
    if value <= floor + 1e-4 || step <= 0.0 {
        return None;
    }
    let next = round3(value - step).max(floor);
    Some(next)
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

// ────────────────────────────────────────────────────────────────────────────
// Page size
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    pub fn width_pt(self) -> f32 {
        match self {
            PageSize::Letter => 612.0,
            PageSize::A4 => 595.28,
        }
    }

    pub fn height_pt(self) -> f32 {
        match self {
            PageSize::Letter => 792.0,
            PageSize::A4 => 841.89,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSize::Letter => "letter",
            PageSize::A4 => "a4",
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Ok(PageSize::Letter),
            "a4" => Ok(PageSize::A4),
            other => Err(format!("unknown page size '{other}' (expected letter or a4)")),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PageSize {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PageSize> for String {
    fn from(size: PageSize) -> Self {
        size.as_str().to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Typography
// ────────────────────────────────────────────────────────────────────────────

/// Concrete sizes and gaps for one render, all in points.
///
/// Everything is a function of `StyleParameters` and the page size. Vertical gaps
/// are multiples of `gap_unit = font_size × line_spacing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Typography {
    pub body_size: f32,
    pub name_size: f32,
    pub heading_size: f32,
    pub entry_title_size: f32,
    pub line_spacing: f32,
    pub gap_unit: f32,
    pub margin: f32,
    pub page_width: f32,
    pub page_height: f32,
    /// Hanging indent for bullet continuation lines.
    pub bullet_indent: f32,
}

impl Typography {
    pub fn new(style: &StyleParameters, page_size: PageSize) -> Self {
        let fs = style.font_size_pt;
        Self {
            body_size: fs,
            name_size: (fs + 14.0).max(18.0),
            heading_size: (fs + 2.0).max(10.0),
            entry_title_size: fs + 1.0,
            line_spacing: style.line_spacing,
            gap_unit: fs * style.line_spacing,
            margin: style.margin_in * PT_PER_IN,
            page_width: page_size.width_pt(),
            page_height: page_size.height_pt(),
            bullet_indent: fs * 1.2,
        }
    }

    pub fn leading(&self, size_pt: f32) -> f32 {
        size_pt * self.line_spacing
    }

    pub fn text_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }

    /// Space above a section heading.
    pub fn heading_space_before(&self) -> f32 {
        self.gap_unit
    }

    /// Space between a heading rule and the first line under it.
    pub fn heading_space_after(&self) -> f32 {
        0.5 * self.gap_unit
    }

    /// Space between consecutive entries of a section.
    pub fn entry_gap(&self) -> f32 {
        0.5 * self.gap_unit
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_down_stops_at_floor() {
        assert_eq!(step_down(9.5, 0.5, 9.0), Some(9.0));
        assert_eq!(step_down(9.0, 0.5, 9.0), None);
    }

    #[test]
    fn test_step_down_clamps_overshoot() {
        assert_eq!(step_down(0.55, 0.1, 0.5), Some(0.5));
    }

    #[test]
    fn test_repeated_line_spacing_steps_land_on_floor() {
        let floors = StyleFloors::default();
        let steps = StyleSteps::default();
        let mut style = StyleParameters::default();
        let mut count = 0;
        while let Some(next) = style.shrink_line_spacing(steps.line_spacing, floors.line_spacing) {
            assert!(next.line_spacing < style.line_spacing);
            style = next;
            count += 1;
        }
        assert_eq!(style.line_spacing, 1.0);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_shrink_font_leaves_other_fields() {
        let style = StyleParameters::default();
        let next = style.shrink_font(0.5, 9.0).unwrap();
        assert_eq!(next.font_size_pt, 9.5);
        assert_eq!(next.margin_in, style.margin_in);
        assert_eq!(next.line_spacing, style.line_spacing);
    }

    #[test]
    fn test_clamped_to_raises_defaults_to_floors() {
        let floors = StyleFloors {
            font_size_pt: 11.0,
            ..StyleFloors::default()
        };
        let style = StyleParameters::default().clamped_to(&floors);
        assert_eq!(style.font_size_pt, 11.0);
        assert!(style.respects(&floors));
    }

    #[test]
    fn test_page_size_parses_case_insensitively() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!(" Letter ".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert!("legal".parse::<PageSize>().is_err());
    }

    #[test]
    fn test_page_size_serde_uses_lowercase_names() {
        let size: PageSize = serde_json::from_str(r#""A4""#).unwrap();
        assert_eq!(size, PageSize::A4);
        assert_eq!(serde_json::to_string(&PageSize::Letter).unwrap(), r#""letter""#);
    }

    #[test]
    fn test_typography_sizes_follow_font_size() {
        let t = Typography::new(&StyleParameters::default(), PageSize::Letter);
        assert_eq!(t.name_size, 24.0);
        assert_eq!(t.heading_size, 12.0);
        assert_eq!(t.entry_title_size, 11.0);
        assert_eq!(t.margin, 54.0);
        assert_eq!(t.text_width(), 504.0);
    }

    #[test]
    fn test_typography_name_size_has_minimum() {
        let style = StyleParameters {
            font_size_pt: 2.0,
            ..StyleParameters::default()
        };
        let t = Typography::new(&style, PageSize::A4);
        assert_eq!(t.name_size, 18.0);
        assert_eq!(t.heading_size, 10.0);
    }
}

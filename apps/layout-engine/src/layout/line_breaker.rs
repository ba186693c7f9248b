//! Greedy word wrap against the static font metrics.

use crate::layout::font_metrics::FontMetricTable;

/// Wraps `text` into lines no wider than `max_width_pt` at `size_pt`.
///
/// Algorithm:
/// 1. Split on whitespace
/// 2. Append words to the current line while they fit, separated by one space
/// 3. A word wider than a whole line is hard-split by characters; its last
///    fragment starts the next line
///
/// An empty or all-whitespace string returns no lines.
pub fn wrap_text(
    text: &str,
    metrics: &FontMetricTable,
    size_pt: f32,
    max_width_pt: f32,
) -> Vec<String> {
    // Work in em units, like the metric tables.
    let max_width = (max_width_pt / size_pt).max(0.0);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_w = metrics.measure_str(word);

        if word_w > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut fragments = split_word(word, metrics, max_width);
            // The tail fragment may still share a line with the next word.
            if let Some(last) = fragments.pop() {
                lines.extend(fragments);
                current_width = metrics.measure_str(&last);
                current = last;
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_w;
        } else if current_width + metrics.space_width + word_w <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += metrics.space_width + word_w;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Splits one over-wide word into fragments that each fit `max_width` (em).
/// Every fragment holds at least one character, so this always terminates.
fn split_word(word: &str, metrics: &FontMetricTable, max_width: f32) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut fragment = String::new();
    let mut width = 0.0_f32;

    for c in word.chars() {
        let w = metrics.char_width(c);
        if !fragment.is_empty() && width + w > max_width {
            fragments.push(std::mem::take(&mut fragment));
            width = 0.0;
        }
        fragment.push(c);
        width += w;
    }
    if !fragment.is_empty() {
        fragments.push(fragment);
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::{get_metrics, FontFace};

    fn regular() -> &'static FontMetricTable {
        get_metrics(FontFace::Regular)
    }

    #[test]
    fn test_wrap_empty_returns_no_lines() {
        assert!(wrap_text("", regular(), 10.0, 500.0).is_empty());
        assert!(wrap_text("   \n ", regular(), 10.0, 500.0).is_empty());
    }

    #[test]
    fn test_wrap_short_text_single_line() {
        let lines = wrap_text("Built data pipelines", regular(), 10.0, 500.0);
        assert_eq!(lines, vec!["Built data pipelines"]);
    }

    #[test]
    fn test_wrap_normalizes_whitespace() {
        let lines = wrap_text("  Built \n data\tpipelines ", regular(), 10.0, 500.0);
        assert_eq!(lines, vec!["Built data pipelines"]);
    }

    #[test]
    fn test_wrapped_lines_fit_width() {
        let text = "Designed and operated a streaming ingestion platform processing \
                    billions of events per day across several regions with strict latency goals";
        let max = 200.0;
        let lines = wrap_text(text, regular(), 10.0, max);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(regular().measure_pt(line, 10.0) <= max + 1e-3, "too wide: {line}");
        }
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_narrower_width_never_needs_fewer_lines() {
        let text = "Led migration of legacy services to a modern container platform";
        let wide = wrap_text(text, regular(), 10.0, 300.0).len();
        let narrow = wrap_text(text, regular(), 10.0, 150.0).len();
        assert!(narrow >= wide);
    }

    #[test]
    fn test_overlong_word_is_hard_split() {
        let word = "x".repeat(200);
        let max = 100.0;
        let lines = wrap_text(&word, regular(), 10.0, max);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(regular().measure_pt(line, 10.0) <= max + 1e-3);
        }
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_tail_fragment_shares_line_with_next_word() {
        let word = "y".repeat(30);
        let text = format!("{word} ok");
        // 30 × 0.5em × 10pt = 150pt; width 100pt fits 20 chars per line.
        let lines = wrap_text(&text, regular(), 10.0, 100.0);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(" ok"));
    }
}

//! Relevance Scoring: measures how strongly a resume item matches the job keywords.
//!
//! Pure and deterministic; allocates only for tokenization. Feeds the pruner, which
//! ranks section entries (and bullets within entries) by this score.

use crate::models::{JobKeywordSet, SectionItem};

/// Score every item gets when the job supplied no keywords.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Saturation constant `k` in `w / (w + k)`. Two solid hits already score 0.5,
/// six score 0.75.
const SATURATION_K: f32 = 2.0;

/// Extra weight for multi-word keywords matched verbatim. Spread over all hits
/// so the total bonus stays below one extra keyword.
const PHRASE_BONUS: f32 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Tokenization
// ────────────────────────────────────────────────────────────────────────────

/// Lowercases and splits on anything that is not alphanumeric, `+` or `#`.
///
/// `"C++/Rust, node.js"` → `["c++", "rust", "node", "js"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Matcher
// ────────────────────────────────────────────────────────────────────────────

/// Pre-tokenized keyword set, built once per pruning pass.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    terms: Vec<Vec<String>>,
}

/// Per-item match counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    /// Distinct keywords found in the item.
    pub hits: usize,
    /// How many of those hits were multi-word phrases.
    pub phrase_hits: usize,
}

impl KeywordMatcher {
    pub fn new(keywords: &JobKeywordSet) -> Self {
        let mut terms: Vec<Vec<String>> = keywords
            .iter()
            .map(tokenize)
            .filter(|t| !t.is_empty())
            .collect();
        // "Node.js" and "node js" normalize to the same term.
        terms.sort();
        terms.dedup();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Counts distinct keyword hits in `text`.
    ///
    /// Single-token keywords match any token; phrases must appear as a contiguous
    /// token sequence.
    pub fn count_matches(&self, text: &str) -> MatchCounts {
        let tokens = tokenize(text);
        let mut counts = MatchCounts::default();
        for term in &self.terms {
            let found = if term.len() == 1 {
                tokens.iter().any(|t| *t == term[0])
            } else {
                tokens.windows(term.len()).any(|w| w == term.as_slice())
            };
            if found {
                counts.hits += 1;
                if term.len() > 1 {
                    counts.phrase_hits += 1;
                }
            }
        }
        counts
    }

    /// Scores raw text in `[0, 1)`.
    ///
    /// Algorithm:
    /// 1. No keywords → `NEUTRAL_SCORE`
    /// 2. `w = hits + PHRASE_BONUS × phrase_hits / hits`
    /// 3. `score = w / (w + SATURATION_K)`
    pub fn score_text(&self, text: &str) -> f32 {
        if self.is_empty() {
            return NEUTRAL_SCORE;
        }
        let counts = self.count_matches(text);
        if counts.hits == 0 {
            return 0.0;
        }
        let hits = counts.hits as f32;
        let weight = hits + PHRASE_BONUS * counts.phrase_hits as f32 / hits;
        weight / (weight + SATURATION_K)
    }

    /// Scores an item from its display text. A previously recorded score is
    /// never consulted.
    pub fn score<T: SectionItem>(&self, item: &T) -> f32 {
        self.score_text(&item.display_text())
    }
}

/// One-shot convenience over `KeywordMatcher`.
pub fn score<T: SectionItem>(item: &T, keywords: &JobKeywordSet) -> f32 {
    KeywordMatcher::new(keywords).score(item)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

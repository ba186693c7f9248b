//! Content Pruner: keeps the most relevant entries of each section within a cap.
//!
//! Ranking happens on a scored copy; the kept entries are projected back into
//! their original display order. Pruning always starts from the canonical
//! document, so omission notes are recomputed rather than stacked.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generation::relevance::KeywordMatcher;
use crate::models::{JobKeywordSet, OmittedCounts, ResumeDocument, SectionItem};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Result of pruning one section.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneOutcome<T> {
    /// Kept items, in their original relative order, with their scores recorded.
    pub kept: Vec<T>,
    pub omitted: usize,
}

/// Per-section item budgets for a document-level prune.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionCaps {
    pub experience: usize,
    pub skills: usize,
    pub projects: usize,
    pub certifications: usize,
    pub education: usize,
    /// Bullets kept per experience/project entry. `None` keeps all.
    pub bullets_per_entry: Option<usize>,
    /// Summary length limit in characters. `None` leaves it untouched.
    pub summary_chars: Option<usize>,
}

impl SectionCaps {
    /// Conservative caps applied before the first render of a one-page request.
    pub fn single_page() -> Self {
        Self {
            experience: 4,
            skills: 10,
            projects: 3,
            certifications: 4,
            education: 3,
            bullets_per_entry: Some(3),
            summary_chars: Some(250),
        }
    }

    /// Caps for multi-page requests whose content is clearly oversized.
    pub fn multi_page() -> Self {
        Self {
            experience: 6,
            skills: 18,
            projects: 5,
            certifications: 8,
            education: 4,
            bullets_per_entry: None,
            summary_chars: None,
        }
    }

    /// Last-resort caps: completeness is traded for the page budget.
    pub fn aggressive() -> Self {
        Self {
            experience: 2,
            skills: 4,
            projects: 1,
            certifications: 1,
            education: 1,
            bullets_per_entry: Some(1),
            summary_chars: Some(100),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section pruning
// ────────────────────────────────────────────────────────────────────────────

/// Keeps the `keep_count` most relevant items.
///
/// Algorithm:
/// 1. Score every item against the keywords
/// 2. Stable-sort a copy of the indices by descending score, ties by index
/// 3. Take the top `keep_count` (at least 1 for a non-empty section)
/// 4. Re-project the kept indices into original order
pub fn prune<T: SectionItem>(
    items: &[T],
    keywords: &JobKeywordSet,
    keep_count: usize,
) -> PruneOutcome<T> {
    prune_with(items, &KeywordMatcher::new(keywords), keep_count)
}

pub(crate) fn prune_with<T: SectionItem>(
    items: &[T],
    matcher: &KeywordMatcher,
    keep_count: usize,
) -> PruneOutcome<T> {
    if items.is_empty() {
        return PruneOutcome {
            kept: Vec::new(),
            omitted: 0,
        };
    }

    let keep_count = keep_count.clamp(1, items.len());

    let mut ranked: Vec<(usize, f32)> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (i, matcher.score(item)))
        .collect();

    // Descending score; equal scores keep their original index order.
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut kept_indices: Vec<(usize, f32)> = ranked.into_iter().take(keep_count).collect();
    kept_indices.sort_by_key(|(i, _)| *i);

    let kept = kept_indices
        .into_iter()
        .map(|(i, score)| {
            let mut item = items[i].clone();
            item.record_score(score);
            item
        })
        .collect();

    PruneOutcome {
        kept,
        omitted: items.len() - keep_count,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document pruning
// ────────────────────────────────────────────────────────────────────────────

/// Prunes every section of the canonical document to `caps`.
///
/// The returned document carries fresh `omitted` counts, so the renderer emits
/// one trailing note per pruned section no matter how often this runs.
pub fn prune_document(
    canonical: &ResumeDocument,
    keywords: &JobKeywordSet,
    caps: &SectionCaps,
) -> ResumeDocument {
    let matcher = KeywordMatcher::new(keywords);

    let experience = prune_with(&canonical.experience, &matcher, caps.experience);
    let skills = prune_with(&canonical.skills, &matcher, caps.skills);
    let projects = prune_with(&canonical.projects, &matcher, caps.projects);
    let certifications = prune_with(&canonical.certifications, &matcher, caps.certifications);
    let education = prune_with(&canonical.education, &matcher, caps.education);

    let omitted = OmittedCounts {
        experience: experience.omitted,
        skills: skills.omitted,
        projects: projects.omitted,
        certifications: certifications.omitted,
        education: education.omitted,
    };

    let mut experience = experience.kept;
    let mut projects = projects.kept;
    if let Some(limit) = caps.bullets_per_entry {
        for entry in &mut experience {
            entry.bullets = trim_bullets(&entry.bullets, &matcher, limit);
        }
        for entry in &mut projects {
            entry.bullets = trim_bullets(&entry.bullets, &matcher, limit);
        }
    }

    let summary = match caps.summary_chars {
        Some(limit) => truncate_summary(&canonical.summary, limit),
        None => canonical.summary.clone(),
    };

    debug!(
        omitted_total = omitted.total(),
        experience = experience.len(),
        skills = skills.kept.len(),
        projects = projects.len(),
        "Pruned document"
    );

    ResumeDocument {
        name: canonical.name.clone(),
        contact_line: canonical.contact_line.clone(),
        summary,
        experience,
        skills: skills.kept,
        projects,
        certifications: certifications.kept,
        education: education.kept,
        omitted,
    }
}

/// Keeps the `limit` most relevant bullets in original order. Empty stays empty.
fn trim_bullets(bullets: &[String], matcher: &KeywordMatcher, limit: usize) -> Vec<String> {
    if bullets.len() <= limit {
        return bullets.to_vec();
    }
    prune_with(bullets, matcher, limit).kept
}

/// Shortens a summary to at most `limit` characters (plus a trailing `...`).
///
/// Prefers cutting after the last sentence end within the final 50 characters of
/// the window, then at the last word boundary in that range, then mid-word.
pub fn truncate_summary(summary: &str, limit: usize) -> String {
    let summary = summary.trim();
    if summary.chars().count() <= limit {
        return summary.to_string();
    }

    let window: String = summary.chars().take(limit).collect();
    let floor = limit.saturating_sub(50);
    let char_pos = |byte_idx: usize| window[..byte_idx].chars().count();

    if let Some(idx) = window.rfind(['.', '!', '?']) {
        if char_pos(idx) > floor {
            return window[..=idx].to_string();
        }
    }
    if let Some(idx) = window.rfind(' ') {
        if char_pos(idx) > floor {
            return format!("{}...", window[..idx].trim_end());
        }
    }
    format!("{window}...")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

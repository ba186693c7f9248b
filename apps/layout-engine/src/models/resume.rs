//! Resume content model: the structured input to the layout engine.
//!
//! A `ResumeDocument` is built once per generation request by an upstream stage and
//! is never mutated during a run. Pruning produces new documents; the canonical one
//! keeps its order and contents.

use serde::{Deserialize, Serialize};

use crate::errors::LayoutError;

// ────────────────────────────────────────────────────────────────────────────
// Section entries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    /// Cached relevance, filled in by the pruner on its working copies.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Section item trait
// ────────────────────────────────────────────────────────────────────────────

/// Anything the relevance scorer and pruner can rank.
///
/// `display_text` is the text a reader sees for the item, which is what gets
/// matched against the job keywords.
pub trait SectionItem: Clone {
    fn display_text(&self) -> String;

    /// Records the score the pruner ranked this item with.
    fn record_score(&mut self, _score: f32) {}
}

impl SectionItem for String {
    fn display_text(&self) -> String {
        self.clone()
    }
}

impl SectionItem for ExperienceEntry {
    fn display_text(&self) -> String {
        let mut parts = vec![self.title.as_str(), self.company.as_str()];
        parts.extend(self.bullets.iter().map(String::as_str));
        parts.join(" ")
    }

    fn record_score(&mut self, score: f32) {
        self.relevance_score = Some(score);
    }
}

impl SectionItem for SkillEntry {
    fn display_text(&self) -> String {
        match &self.category {
            Some(category) => format!("{} {}", self.name, category),
            None => self.name.clone(),
        }
    }

    fn record_score(&mut self, score: f32) {
        self.relevance_score = Some(score);
    }
}

impl SectionItem for ProjectEntry {
    fn display_text(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        parts.extend(self.bullets.iter().map(String::as_str));
        parts.extend(self.technologies.iter().map(String::as_str));
        parts.join(" ")
    }

    fn record_score(&mut self, score: f32) {
        self.relevance_score = Some(score);
    }
}

impl SectionItem for CertificationEntry {
    fn display_text(&self) -> String {
        match &self.issuer {
            Some(issuer) => format!("{} {}", self.name, issuer),
            None => self.name.clone(),
        }
    }

    fn record_score(&mut self, score: f32) {
        self.relevance_score = Some(score);
    }
}

impl SectionItem for EducationEntry {
    fn display_text(&self) -> String {
        format!("{} {}", self.degree, self.institution)
    }

    fn record_score(&mut self, score: f32) {
        self.relevance_score = Some(score);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// The five repeatable sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Experience,
    Skills,
    Projects,
    Certifications,
    Education,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Experience,
        SectionKind::Skills,
        SectionKind::Projects,
        SectionKind::Certifications,
        SectionKind::Education,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::Experience => "PROFESSIONAL EXPERIENCE",
            SectionKind::Skills => "TECHNICAL SKILLS & EXPERTISE",
            SectionKind::Projects => "PROJECTS & ACHIEVEMENTS",
            SectionKind::Certifications => "CERTIFICATIONS & TRAINING",
            SectionKind::Education => "EDUCATION",
        }
    }

    /// The single trailing note appended when the pruner dropped entries.
    pub fn omission_note(self) -> &'static str {
        match self {
            SectionKind::Experience => "Additional professional experience available upon request.",
            SectionKind::Skills => "Additional skills available upon request.",
            SectionKind::Projects => "Additional projects available upon request.",
            SectionKind::Certifications => "Additional certifications available upon request.",
            SectionKind::Education => "Additional education available upon request.",
        }
    }
}

/// Number of entries the pruner removed from each section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmittedCounts {
    pub experience: usize,
    pub skills: usize,
    pub projects: usize,
    pub certifications: usize,
    pub education: usize,
}

impl OmittedCounts {
    pub fn get(&self, section: SectionKind) -> usize {
        match section {
            SectionKind::Experience => self.experience,
            SectionKind::Skills => self.skills,
            SectionKind::Projects => self.projects,
            SectionKind::Certifications => self.certifications,
            SectionKind::Education => self.education,
        }
    }

    pub fn total(&self) -> usize {
        SectionKind::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeDocument {
    pub name: String,
    #[serde(default)]
    pub contact_line: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub certifications: Vec<CertificationEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    /// Set by the pruner only; callers never supply it.
    #[serde(skip)]
    pub omitted: OmittedCounts,
}

impl ResumeDocument {
    /// Fails fast on content no amount of compression can fix.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.name.trim().is_empty() {
            return Err(LayoutError::InvalidContent("name is required".to_string()));
        }
        if let Some(i) = self.experience.iter().position(|e| e.title.trim().is_empty()) {
            return Err(LayoutError::InvalidContent(format!(
                "experience entry {i} is missing a title"
            )));
        }
        if let Some(i) = self.skills.iter().position(|s| s.name.trim().is_empty()) {
            return Err(LayoutError::InvalidContent(format!(
                "skill entry {i} is missing a name"
            )));
        }
        if let Some(i) = self.projects.iter().position(|p| p.name.trim().is_empty()) {
            return Err(LayoutError::InvalidContent(format!(
                "project entry {i} is missing a name"
            )));
        }
        if let Some(i) = self
            .certifications
            .iter()
            .position(|c| c.name.trim().is_empty())
        {
            return Err(LayoutError::InvalidContent(format!(
                "certification entry {i} is missing a name"
            )));
        }
        if let Some(i) = self
            .education
            .iter()
            .position(|e| e.degree.trim().is_empty() && e.institution.trim().is_empty())
        {
            return Err(LayoutError::InvalidContent(format!(
                "education entry {i} needs a degree or an institution"
            )));
        }
        Ok(())
    }

    pub fn section_len(&self, section: SectionKind) -> usize {
        match section {
            SectionKind::Experience => self.experience.len(),
            SectionKind::Skills => self.skills.len(),
            SectionKind::Projects => self.projects.len(),
            SectionKind::Certifications => self.certifications.len(),
            SectionKind::Education => self.education.len(),
        }
    }

    /// Plain structured-text rendering, used by callers when PDF rendering fails.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        out.push_str(self.name.trim());
        out.push('\n');
        if !self.contact_line.trim().is_empty() {
            out.push_str(self.contact_line.trim());
            out.push('\n');
        }
        if !self.summary.trim().is_empty() {
            out.push_str("\nPROFESSIONAL SUMMARY\n");
            out.push_str(self.summary.trim());
            out.push('\n');
        }

        for section in SectionKind::ALL {
            if self.section_len(section) == 0 {
                continue;
            }
            out.push('\n');
            out.push_str(section.heading());
            out.push('\n');
            match section {
                SectionKind::Experience => {
                    for e in &self.experience {
                        out.push_str(&e.title);
                        let sub = join_present(&[&e.company, &e.duration], " | ");
                        if !sub.is_empty() {
                            out.push_str(" - ");
                            out.push_str(&sub);
                        }
                        out.push('\n');
                        for b in &e.bullets {
                            out.push_str(&format!("  - {b}\n"));
                        }
                    }
                }
                SectionKind::Skills => {
                    for s in &self.skills {
                        out.push_str(&format!("  - {}\n", s.name));
                    }
                }
                SectionKind::Projects => {
                    for p in &self.projects {
                        out.push_str(&p.name);
                        out.push('\n');
                        for b in &p.bullets {
                            out.push_str(&format!("  - {b}\n"));
                        }
                        if !p.technologies.is_empty() {
                            out.push_str(&format!("  Technologies: {}\n", p.technologies.join(", ")));
                        }
                    }
                }
                SectionKind::Certifications => {
                    for c in &self.certifications {
                        out.push_str(&format!("  - {}\n", c.name));
                    }
                }
                SectionKind::Education => {
                    for e in &self.education {
                        out.push_str(&join_present(&[&e.degree, &e.institution], ", "));
                        out.push('\n');
                    }
                }
            }
            if self.omitted.get(section) > 0 {
                out.push_str(section.omission_note());
                out.push('\n');
            }
        }
        out
    }
}

/// Joins the non-blank parts with `sep`.
pub(crate) fn join_present(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

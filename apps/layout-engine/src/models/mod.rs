pub mod keywords;
pub mod resume;

pub use keywords::JobKeywordSet;
pub use resume::{
    CertificationEntry, EducationEntry, ExperienceEntry, OmittedCounts, ProjectEntry,
    ResumeDocument, SectionItem, SectionKind, SkillEntry,
};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Keywords extracted from a job description by an upstream stage.
///
/// Stored lowercased and trimmed in a sorted set, so iteration order (and
/// therefore every score derived from it) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct JobKeywordSet {
    keywords: BTreeSet<String>,
}

impl JobKeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for JobKeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<JobKeywordSet> for Vec<String> {
    fn from(set: JobKeywordSet) -> Self {
        set.keywords.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_lowercased_and_deduplicated() {
        let set = JobKeywordSet::new(["Python", " python ", "SQL", ""]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["python", "sql"]);
    }

    #[test]
    fn test_deserializes_from_plain_list() {
        let set: JobKeywordSet = serde_json::from_str(r#"["Rust", "Machine Learning"]"#).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["machine learning", "rust"]);
    }
}

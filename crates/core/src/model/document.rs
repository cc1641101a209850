use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::model::{Grade, GradeProgress, SentenceId, UserPreferences};
use crate::streak::StreakInfo;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Everything the app persists for one install.
///
/// `grade_progress` is a cache: counts and rates are regenerated from
/// `studied` and the sentence catalog, only each grade's `last_study_date`
/// is carried over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyDocument {
    pub schema_version: String,
    pub studied: BTreeMap<Grade, BTreeSet<SentenceId>>,
    pub streak: StreakInfo,
    pub important: BTreeSet<SentenceId>,
    pub preferences: UserPreferences,
    pub grade_progress: BTreeMap<Grade, GradeProgress>,
    pub last_backup_date: Option<DateTime<Utc>>,
}

impl Default for StudyDocument {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            studied: BTreeMap::new(),
            streak: StreakInfo::default(),
            important: BTreeSet::new(),
            preferences: UserPreferences::default(),
            grade_progress: BTreeMap::new(),
            last_backup_date: None,
        }
    }
}

impl StudyDocument {
    /// Add `id` to the grade's studied set. Returns `true` if it was new.
    pub fn mark_studied(&mut self, grade: Grade, id: SentenceId) -> bool {
        self.studied.entry(grade).or_default().insert(id)
    }

    #[must_use]
    pub fn is_studied(&self, grade: Grade, id: &SentenceId) -> bool {
        self.studied.get(&grade).is_some_and(|set| set.contains(id))
    }

    /// Number of distinct sentences studied in `grade`.
    #[must_use]
    pub fn studied_count(&self, grade: Grade) -> usize {
        self.studied.get(&grade).map_or(0, BTreeSet::len)
    }

    /// Drop the grade's studied set and cached progress.
    pub fn clear_grade(&mut self, grade: Grade) {
        self.studied.remove(&grade);
        self.grade_progress.remove(&grade);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.studied.values().all(BTreeSet::is_empty)
            && self.important.is_empty()
            && self.streak.last_study_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> SentenceId {
        SentenceId::new(raw).unwrap()
    }

    #[test]
    fn default_document_is_empty_and_current() {
        let doc = StudyDocument::default();
        assert!(doc.is_empty());
        assert_eq!(doc.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn marking_is_idempotent() {
        let mut doc = StudyDocument::default();
        assert!(doc.mark_studied(Grade::High1, id("h1-1")));
        assert!(!doc.mark_studied(Grade::High1, id("h1-1")));
        assert_eq!(doc.studied_count(Grade::High1), 1);
        assert!(doc.is_studied(Grade::High1, &id("h1-1")));
        assert!(!doc.is_studied(Grade::High2, &id("h1-1")));
    }

    #[test]
    fn clear_grade_leaves_others() {
        let mut doc = StudyDocument::default();
        doc.mark_studied(Grade::High1, id("a"));
        doc.mark_studied(Grade::High2, id("b"));
        doc.clear_grade(Grade::High1);
        assert_eq!(doc.studied_count(Grade::High1), 0);
        assert_eq!(doc.studied_count(Grade::High2), 1);
    }
}

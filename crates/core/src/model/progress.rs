use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Grade;

/// Percentage of `studied` over `total`, rounded half away from zero.
///
/// Returns 0 when `total` is 0 and never exceeds 100.
#[must_use]
pub fn completion_rate(studied: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let studied = studied.min(total);
    // Integer form of round(studied / total * 100).
    let rate = (studied * 200 + total) / (total * 2);
    u8::try_from(rate).unwrap_or(100)
}

/// Derived per-grade statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeProgress {
    pub total_sentences: usize,
    pub studied_sentences: usize,
    pub completion_rate: u8,
    pub streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

impl GradeProgress {
    #[must_use]
    pub fn compute(
        total_sentences: usize,
        studied_sentences: usize,
        streak: u32,
        last_study_date: Option<NaiveDate>,
    ) -> Self {
        let studied_sentences = studied_sentences.min(total_sentences);
        Self {
            total_sentences,
            studied_sentences,
            completion_rate: completion_rate(studied_sentences, total_sentences),
            streak,
            last_study_date,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::compute(0, 0, 0, None)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_sentences > 0 && self.studied_sentences == self.total_sentences
    }
}

/// Totals across every grade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverallProgress {
    pub total_sentences: usize,
    pub total_studied_sentences: usize,
    pub overall_completion_rate: u8,
    pub grade_progress: BTreeMap<Grade, GradeProgress>,
}

impl OverallProgress {
    #[must_use]
    pub fn from_grades(grade_progress: BTreeMap<Grade, GradeProgress>) -> Self {
        let total_sentences = grade_progress.values().map(|p| p.total_sentences).sum();
        let total_studied_sentences = grade_progress.values().map(|p| p.studied_sentences).sum();
        Self {
            total_sentences,
            total_studied_sentences,
            overall_completion_rate: completion_rate(total_studied_sentences, total_sentences),
            grade_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_stays_in_bounds_and_is_monotonic() {
        for total in 1..=60_usize {
            let mut previous = 0;
            for studied in 0..=total {
                let rate = completion_rate(studied, total);
                assert!(rate <= 100);
                assert!(rate >= previous, "{studied}/{total}");
                previous = rate;
            }
            assert_eq!(completion_rate(0, total), 0);
            assert_eq!(completion_rate(total, total), 100);
        }
    }

    #[test]
    fn completion_rate_caps_and_handles_zero_total() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(7, 0), 0);
        assert_eq!(completion_rate(12, 10), 100);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
    }

    #[test]
    fn overall_aggregates_grades() {
        let mut grades = BTreeMap::new();
        grades.insert(Grade::Middle1, GradeProgress::compute(10, 3, 0, None));
        grades.insert(Grade::Middle2, GradeProgress::compute(5, 5, 0, None));

        let overall = OverallProgress::from_grades(grades);
        assert_eq!(overall.total_sentences, 15);
        assert_eq!(overall.total_studied_sentences, 8);
        assert_eq!(overall.overall_completion_rate, 53);
        assert!(overall.grade_progress[&Grade::Middle2].is_complete());
    }

    #[test]
    fn overall_of_nothing_is_zero() {
        let overall = OverallProgress::from_grades(BTreeMap::new());
        assert_eq!(overall.overall_completion_rate, 0);
    }
}

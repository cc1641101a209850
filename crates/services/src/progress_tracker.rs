use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use sentence_core::model::{Grade, GradeProgress, OverallProgress, SentenceId};
use sentence_core::streak::{StreakInfo, StreakTransition};

use crate::study_session::StudySession;

/// Turns study events into per-grade and overall progress.
///
/// Invalid arguments are logged and ignored; nothing here returns an error
/// or waits on storage. Every mutation queues a snapshot for saving.
#[derive(Clone)]
pub struct ProgressTracker {
    session: Arc<StudySession>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(session: Arc<StudySession>) -> Self {
        Self { session }
    }

    /// Record that `sentence_id` of `grade` was studied just now.
    pub fn record_study_event(&self, grade: Grade, sentence_id: &str) {
        self.record_study_event_at(grade, sentence_id, self.session.now());
    }

    /// Record a study event that happened at `now`.
    ///
    /// Studying an already-studied sentence still counts for the streak.
    pub fn record_study_event_at(&self, grade: Grade, sentence_id: &str, now: DateTime<Utc>) {
        let id = match SentenceId::new(sentence_id) {
            Ok(id) => id,
            Err(err) => {
                error!(%grade, %err, "ignoring study event");
                return;
            }
        };

        let catalog = self.session.catalog();
        self.session.mutate(|state| {
            let newly_studied = state.document.mark_studied(grade, id.clone());
            let transition = state.streak.on_study_event(now);
            let today = state.streak.date_of(now);

            let mut progress = state.refresh_grade(grade, catalog);
            progress.last_study_date = Some(today);
            state.document.grade_progress.insert(grade, progress.clone());

            match transition {
                StreakTransition::Broken { missed_days } => {
                    info!(missed_days, "study streak restarted");
                }
                StreakTransition::Continued => {
                    info!(streak = state.streak.current_streak(), "study streak extended");
                }
                StreakTransition::FirstStudy | StreakTransition::SameDay => {}
            }
            debug!(
                %grade,
                sentence = %id,
                newly_studied,
                completion_rate = progress.completion_rate,
                "study event recorded"
            );
        });
    }

    /// Record a study event from untyped UI input.
    ///
    /// An empty or unknown grade is logged and ignored.
    pub fn record_study_event_raw(&self, grade: &str, sentence_id: &str) {
        match Grade::parse(grade) {
            Ok(grade) => self.record_study_event(grade, sentence_id),
            Err(err) => error!(%err, "ignoring study event"),
        }
    }

    /// Fresh progress for `grade`, recomputed from current state.
    #[must_use]
    pub fn grade_progress(&self, grade: Grade) -> GradeProgress {
        let catalog = self.session.catalog();
        self.session
            .refresh(|state| state.refresh_grade(grade, catalog))
    }

    /// Totals across all six grades.
    #[must_use]
    pub fn overall_progress(&self) -> OverallProgress {
        let catalog = self.session.catalog();
        let grades: BTreeMap<Grade, GradeProgress> = self.session.refresh(|state| {
            Grade::ALL
                .into_iter()
                .map(|grade| (grade, state.refresh_grade(grade, catalog)))
                .collect()
        });
        OverallProgress::from_grades(grades)
    }

    #[must_use]
    pub fn is_sentence_studied(&self, grade: Grade, sentence_id: &str) -> bool {
        let Ok(id) = SentenceId::new(sentence_id) else {
            error!(%grade, "blank sentence id in studied lookup");
            return false;
        };
        self.session
            .read(|state| state.document.is_studied(grade, &id))
    }

    /// Studied sentence ids of `grade`, sorted.
    #[must_use]
    pub fn studied_sentence_ids(&self, grade: Grade) -> Vec<SentenceId> {
        self.session.read(|state| {
            state
                .document
                .studied
                .get(&grade)
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Forget everything studied in `grade`. Other grades and the streak stay.
    pub fn reset_grade_progress(&self, grade: Grade) {
        let catalog = self.session.catalog();
        self.session.mutate(|state| {
            state.document.clear_grade(grade);
            state.refresh_grade(grade, catalog);
        });
        info!(%grade, "grade progress reset");
    }

    /// Forget every studied sentence and reset the streak to zero.
    pub fn reset_all_progress(&self) {
        let catalog = self.session.catalog();
        self.session.mutate(|state| {
            state.document.studied.clear();
            state.document.grade_progress.clear();
            state.streak.reset();
            state.refresh_all(catalog);
        });
        info!("all progress reset");
    }

    #[must_use]
    pub fn streak_info(&self) -> StreakInfo {
        self.session.read(|state| state.streak.streak_info())
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.session.read(|state| state.streak.current_streak())
    }
}

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use sentence_core::catalog::SentenceCatalog;
use sentence_core::model::{Grade, GradeProgress, StudyDocument};
use sentence_core::streak::StreakCalculator;
use sentence_core::{CalendarZone, Clock};
use storage::{DocumentPatch, DocumentWriter};

/// In-memory study state: the document plus the streak calculator that owns
/// its streak.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub document: StudyDocument,
    pub streak: StreakCalculator,
}

impl SessionState {
    fn new(document: StudyDocument, zone: CalendarZone) -> Self {
        let streak = StreakCalculator::with_state(zone, document.streak);
        Self { document, streak }
    }

    /// The document as it should be persisted.
    pub fn snapshot(&self) -> StudyDocument {
        let mut doc = self.document.clone();
        doc.streak = self.streak.streak_info();
        doc
    }

    /// Distinct studied sentences of `grade` that still exist in the catalog.
    fn studied_in_catalog(&self, grade: Grade, catalog: &dyn SentenceCatalog) -> usize {
        let Some(studied) = self.document.studied.get(&grade) else {
            return 0;
        };
        let known = catalog.sentence_ids(grade);
        if known.is_empty() {
            return studied.len();
        }
        known.iter().filter(|id| studied.contains(*id)).count()
    }

    /// Recompute the cached progress of `grade`.
    pub fn refresh_grade(&mut self, grade: Grade, catalog: &dyn SentenceCatalog) -> GradeProgress {
        let total = catalog.sentence_count(grade);
        let studied = self.studied_in_catalog(grade, catalog);
        let last_study_date = self
            .document
            .grade_progress
            .get(&grade)
            .and_then(|p| p.last_study_date);
        let progress =
            GradeProgress::compute(total, studied, self.streak.current_streak(), last_study_date);
        self.document.grade_progress.insert(grade, progress.clone());
        progress
    }

    pub fn refresh_all(&mut self, catalog: &dyn SentenceCatalog) {
        for grade in Grade::ALL {
            self.refresh_grade(grade, catalog);
        }
    }
}

/// The loaded study document shared by every writer.
///
/// Mutations happen under one lock and enqueue a full snapshot before the
/// lock is released, so the write queue sees snapshots in mutation order.
pub struct StudySession {
    state: Mutex<SessionState>,
    zone: CalendarZone,
    clock: Clock,
    catalog: Arc<dyn SentenceCatalog>,
    writer: DocumentWriter,
}

impl StudySession {
    #[must_use]
    pub fn new(
        document: StudyDocument,
        zone: CalendarZone,
        clock: Clock,
        catalog: Arc<dyn SentenceCatalog>,
        writer: DocumentWriter,
    ) -> Self {
        let mut state = SessionState::new(document, zone);
        state.refresh_all(catalog.as_ref());
        Self {
            state: Mutex::new(state),
            zone,
            clock,
            catalog,
            writer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn catalog(&self) -> &dyn SentenceCatalog {
        self.catalog.as_ref()
    }

    /// Read-only access to the state.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.lock())
    }

    /// Update derived data without persisting it.
    pub(crate) fn refresh<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Mutate the state and queue the resulting snapshot for saving.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.lock();
        let result = f(&mut guard);
        self.writer
            .enqueue(DocumentPatch::from(guard.snapshot()));
        result
    }

    /// Swap in `document`, regenerating progress, and queue it for saving.
    ///
    /// The swap and the enqueue happen under the state lock, so snapshots of
    /// concurrent mutations land either before it in the queue or after it
    /// built on the new state. The returned future reports whether the
    /// document was stored.
    pub(crate) fn replace(
        &self,
        document: StudyDocument,
    ) -> impl Future<Output = bool> + Send + use<> {
        let mut state = SessionState::new(document, self.zone);
        state.refresh_all(self.catalog.as_ref());
        let mut guard = self.lock();
        *guard = state;
        self.writer
            .enqueue_acked(DocumentPatch::from(guard.snapshot()))
    }

    /// Reset to an empty document and queue removal of the stored one, under
    /// the same lock as [`StudySession::replace`].
    pub(crate) fn clear(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut state = SessionState::new(StudyDocument::default(), self.zone);
        state.refresh_all(self.catalog.as_ref());
        let mut guard = self.lock();
        *guard = state;
        self.writer.enqueue_clear()
    }

    /// Copy of the current document.
    #[must_use]
    pub fn snapshot(&self) -> StudyDocument {
        self.lock().snapshot()
    }

    /// Wait until every queued snapshot has been saved.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

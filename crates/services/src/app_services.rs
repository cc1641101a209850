use std::sync::Arc;

use sentence_core::catalog::SentenceCatalog;
use sentence_core::model::{CURRENT_SCHEMA_VERSION, StudyDocument};
use sentence_core::{CalendarZone, Clock};
use storage::repository::{InMemoryKeyValueStore, KeyValueStore};
use storage::sqlite::SqliteRepository;
use storage::{DocumentStore, DocumentWriter};
use tracing::info;

use crate::data_service::DataService;
use crate::error::AppServicesError;
use crate::important_service::ImportantSentencesService;
use crate::preferences_service::PreferencesService;
use crate::progress_tracker::ProgressTracker;
use crate::study_session::StudySession;

/// Construction point for every service sharing one study session.
///
/// Must be built inside a tokio runtime: it starts the document write queue.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<StudySession>,
    progress: Arc<ProgressTracker>,
    preferences: Arc<PreferencesService>,
    important: Arc<ImportantSentencesService>,
    data: Arc<DataService>,
}

impl AppServices {
    /// Load (or initialize) the document from `kv` and assemble services.
    pub async fn open(
        kv: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn SentenceCatalog>,
        clock: Clock,
        zone: CalendarZone,
    ) -> Self {
        let store = Arc::new(DocumentStore::new(kv, clock));
        let document = match store.load().await {
            Some(document) => document,
            None => {
                info!("no usable stored document, starting fresh");
                store.migrate(None, CURRENT_SCHEMA_VERSION).await;
                StudyDocument::default()
            }
        };

        let writer = DocumentWriter::spawn(Arc::clone(&store));
        let session = Arc::new(StudySession::new(document, zone, clock, catalog, writer));

        Self {
            progress: Arc::new(ProgressTracker::new(Arc::clone(&session))),
            preferences: Arc::new(PreferencesService::new(Arc::clone(&session))),
            important: Arc::new(ImportantSentencesService::new(Arc::clone(&session))),
            data: Arc::new(DataService::new(Arc::clone(&session), store)),
            session,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        quota_bytes: Option<usize>,
        catalog: Arc<dyn SentenceCatalog>,
        clock: Clock,
        zone: CalendarZone,
    ) -> Result<Self, AppServicesError> {
        let kv = SqliteRepository::open(db_url, quota_bytes).await?;
        Ok(Self::open(kv, catalog, clock, zone).await)
    }

    /// Services over a throwaway in-memory medium.
    pub async fn in_memory(
        catalog: Arc<dyn SentenceCatalog>,
        clock: Clock,
        zone: CalendarZone,
    ) -> Self {
        Self::open(Arc::new(InMemoryKeyValueStore::new()), catalog, clock, zone).await
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn preferences(&self) -> Arc<PreferencesService> {
        Arc::clone(&self.preferences)
    }

    #[must_use]
    pub fn important(&self) -> Arc<ImportantSentencesService> {
        Arc::clone(&self.important)
    }

    #[must_use]
    pub fn data(&self) -> Arc<DataService> {
        Arc::clone(&self.data)
    }

    /// Wait for queued saves to reach storage.
    pub async fn flush(&self) {
        self.session.flush().await;
    }
}

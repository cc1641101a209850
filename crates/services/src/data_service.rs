use std::sync::Arc;

use storage::{BackupInfo, DocumentStore};
use tracing::{info, warn};

use crate::study_session::StudySession;

/// Backups, export/import and "clear all data".
///
/// Restore, import and clear swap the in-memory session and queue the matching
/// storage write in one step, behind every snapshot already queued, so study
/// events racing with them cannot leave memory and storage apart.
#[derive(Clone)]
pub struct DataService {
    session: Arc<StudySession>,
    store: Arc<DocumentStore>,
}

impl DataService {
    #[must_use]
    pub fn new(session: Arc<StudySession>, store: Arc<DocumentStore>) -> Self {
        Self { session, store }
    }

    pub async fn create_backup(&self) -> Option<String> {
        self.session.flush().await;
        self.store.create_backup().await
    }

    pub async fn list_backups(&self) -> Vec<BackupInfo> {
        self.store.list_backups().await
    }

    /// Load backup `id` into the session and save it as the main document.
    ///
    /// `false` if the backup is missing or corrupt, or the save failed.
    pub async fn restore_from_backup(&self, id: &str) -> bool {
        let Some(document) = self.store.read_backup(id).await else {
            return false;
        };
        let saved = self.session.replace(document).await;
        if saved {
            info!(backup = id, "study data restored from backup");
        } else {
            warn!(backup = id, "restored backup could not be saved");
        }
        saved
    }

    /// The current session as export text.
    pub async fn export_as_text(&self) -> String {
        self.store.export_document(&self.session.snapshot())
    }

    /// Load an exported document into the session and save it.
    ///
    /// A rejected import changes nothing.
    pub async fn import_from_text(&self, text: &str) -> bool {
        let Some(document) = DocumentStore::parse_import(text) else {
            return false;
        };
        let saved = self.session.replace(document).await;
        if saved {
            info!("study data imported");
        } else {
            warn!("imported data could not be saved");
        }
        saved
    }

    /// Reset everything to defaults and remove the stored document.
    ///
    /// Backups are kept.
    pub async fn clear_all_data(&self) {
        self.session.clear().await;
        info!("all study data cleared");
    }
}

//! The single versioned "complete data" document and its backups.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use sentence_core::Clock;
use sentence_core::model::{CURRENT_SCHEMA_VERSION, StudyDocument};

use crate::adapter::KvAdapter;
use crate::record::{DocumentPatch, DocumentRecord, ExportRecord, REQUIRED_IMPORT_FIELDS};
use crate::repository::KeyValueStore;

/// Key holding the main document.
pub const MAIN_DOCUMENT_KEY: &str = "sentence_cards_complete_data";

/// Prefix of backup keys; the rest of the key is the backup id.
pub const BACKUP_KEY_PREFIX: &str = "sentence_cards_backup_";

/// Prefix of keys holding a main document that could not be decoded.
pub const UNREADABLE_KEY_PREFIX: &str = "sentence_cards_unreadable_";

/// Version stamped into exports.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const BACKUP_ID_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// Backup id for a snapshot taken at `at`: ISO 8601 with `:` and `.` as `-`.
#[must_use]
pub fn backup_id_for(at: DateTime<Utc>) -> String {
    at.format(BACKUP_ID_FORMAT).to_string()
}

fn backup_key(id: &str) -> String {
    format!("{BACKUP_KEY_PREFIX}{id}")
}

/// Timestamp and collision sequence of a backup id (`<stamp>` or `<stamp>-<n>`).
fn parse_backup_id(id: &str) -> Option<(DateTime<Utc>, u32)> {
    let (stamp, seq) = match id.rsplit_once("Z-") {
        Some((stamp, seq)) => (&id[..=stamp.len()], seq.parse().ok()?),
        None => (id, 0),
    };
    NaiveDateTime::parse_from_str(stamp, BACKUP_ID_FORMAT)
        .ok()
        .map(|naive| (naive.and_utc(), seq))
}

/// Listing entry for a stored backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub size_bytes: usize,
}

/// Reads and writes the study document through a [`KvAdapter`].
///
/// No method returns an error. Corrupt or missing data loads as `None`;
/// failed writes are logged and reported as `false`. Writes to the main key
/// are serialized so at most one is in flight.
pub struct DocumentStore {
    adapter: KvAdapter,
    clock: Clock,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Clock) -> Self {
        Self {
            adapter: KvAdapter::new(store),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &KvAdapter {
        &self.adapter
    }

    async fn read_record(&self, key: &str) -> Option<DocumentRecord> {
        let raw = self.adapter.read(key).await?;
        match serde_json::from_str::<DocumentRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                error!(key, %err, "stored document is corrupt, ignoring it");
                None
            }
        }
    }

    async fn write_record(&self, record: &DocumentRecord) -> bool {
        let text = match serde_json::to_string(record) {
            Ok(text) => text,
            Err(err) => {
                error!(%err, "failed to serialize document");
                return false;
            }
        };
        self.write_raw(&text).await
    }

    async fn write_raw(&self, text: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        self.adapter.write(MAIN_DOCUMENT_KEY, text).await
    }

    /// Load the stored document, migrating it if its version is not current.
    ///
    /// Returns `None` when nothing is stored or the stored value is corrupt.
    pub async fn load(&self) -> Option<StudyDocument> {
        let Some(record) = self.read_record(MAIN_DOCUMENT_KEY).await else {
            debug!("no stored document");
            return None;
        };

        let stored_version = record.schema_version.clone();
        let mut doc = record.into_document();

        if stored_version.as_deref() != Some(CURRENT_SCHEMA_VERSION) {
            self.migrate(stored_version.as_deref(), CURRENT_SCHEMA_VERSION)
                .await;
            doc.schema_version = CURRENT_SCHEMA_VERSION.to_string();
        }

        Some(doc)
    }

    /// Merge `patch` over defaults, stamp the save time and write it.
    ///
    /// Returns whether the document reached the medium.
    pub async fn save(&self, patch: DocumentPatch) -> bool {
        let doc = patch.merge_over_defaults(self.clock.now());
        let written = self
            .write_record(&DocumentRecord::from_document(&doc))
            .await;
        if !written {
            warn!("document save did not persist");
        }
        written
    }

    /// Re-stamp the stored document with version `to`.
    ///
    /// Field layouts have not changed between versions, so this only records
    /// the new version. With nothing stored a default document is written. A
    /// stored value that does not decode is left untouched and copied under an
    /// [`UNREADABLE_KEY_PREFIX`] key so a later save cannot lose it.
    pub async fn migrate(&self, from: Option<&str>, to: &str) {
        match from {
            Some(from) if from == to => return,
            Some(from) => info!(from, to, "migrating stored document"),
            None => info!(to, "stamping schema version on first run"),
        }

        let mut record = match self.adapter.read(MAIN_DOCUMENT_KEY).await {
            None => DocumentRecord::from_document(&StudyDocument::default()),
            Some(raw) => match serde_json::from_str::<DocumentRecord>(&raw) {
                Ok(record) => record,
                Err(err) => {
                    self.set_aside_unreadable(&raw).await;
                    warn!(%err, "stored document does not decode, leaving it in place");
                    return;
                }
            },
        };
        record.schema_version = Some(to.to_string());
        self.write_record(&record).await;
    }

    async fn set_aside_unreadable(&self, raw: &str) {
        let key = format!("{UNREADABLE_KEY_PREFIX}{}", backup_id_for(self.clock.now()));
        if self.adapter.read(&key).await.is_none() && self.adapter.write(&key, raw).await {
            info!(key, "unreadable document preserved");
        }
    }

    /// Remove the main document.
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.adapter.remove(MAIN_DOCUMENT_KEY).await;
    }

    //
    // ─── BACKUPS ───────────────────────────────────────────────────────────────
    //

    /// Snapshot the stored document under a timestamped key.
    ///
    /// A second backup within the same millisecond gets a `-<n>` suffix.
    /// Returns the backup id, or `None` if the document is corrupt or the
    /// snapshot could not be written.
    pub async fn create_backup(&self) -> Option<String> {
        let contents = match self.adapter.read(MAIN_DOCUMENT_KEY).await {
            Some(raw) if serde_json::from_str::<DocumentRecord>(&raw).is_ok() => raw,
            Some(_) => {
                warn!("refusing to back up a corrupt document");
                return None;
            }
            None => serde_json::to_string(&DocumentRecord::from_document(
                &StudyDocument::default(),
            ))
            .ok()?,
        };

        let stamp = backup_id_for(self.clock.now());
        let mut id = stamp.clone();
        let mut seq = 0_u32;
        while self.adapter.read(&backup_key(&id)).await.is_some() {
            seq += 1;
            id = format!("{stamp}-{seq}");
        }

        if self.adapter.write(&backup_key(&id), &contents).await {
            info!(backup = %id, "backup created");
            Some(id)
        } else {
            None
        }
    }

    /// Stored backups, newest first.
    pub async fn list_backups(&self) -> Vec<BackupInfo> {
        let mut backups = Vec::new();
        for key in self.adapter.keys().await {
            let Some(id) = key.strip_prefix(BACKUP_KEY_PREFIX) else {
                continue;
            };
            let Some((timestamp, seq)) = parse_backup_id(id) else {
                warn!(key, "ignoring backup with unreadable timestamp");
                continue;
            };
            let size_bytes = self.adapter.read(&key).await.map_or(0, |raw| raw.len());
            let info = BackupInfo {
                id: id.to_string(),
                timestamp,
                size_bytes,
            };
            backups.push((seq, info));
        }
        backups.sort_by(|(a_seq, a), (b_seq, b)| {
            b.timestamp.cmp(&a.timestamp).then(b_seq.cmp(a_seq))
        });
        backups.into_iter().map(|(_, info)| info).collect()
    }

    /// The document held by backup `id`, stamped with the current version.
    ///
    /// `None` if the backup is missing or does not decode.
    pub async fn read_backup(&self, id: &str) -> Option<StudyDocument> {
        let Some(raw) = self.adapter.read(&backup_key(id)).await else {
            warn!(backup = id, "backup not found");
            return None;
        };
        match serde_json::from_str::<DocumentRecord>(&raw) {
            Ok(record) => {
                let mut doc = record.into_document();
                doc.schema_version = CURRENT_SCHEMA_VERSION.to_string();
                Some(doc)
            }
            Err(err) => {
                warn!(backup = id, %err, "backup is corrupt");
                None
            }
        }
    }

    /// Replace the main document with backup `id`.
    pub async fn restore_from_backup(&self, id: &str) -> bool {
        let Some(doc) = self.read_backup(id).await else {
            return false;
        };
        let restored = self.save(DocumentPatch::from(doc)).await;
        if restored {
            info!(backup = id, "document restored from backup");
        }
        restored
    }

    //
    // ─── EXPORT / IMPORT ───────────────────────────────────────────────────────
    //

    /// Pretty-printed stored document with export date and app version.
    pub async fn export_as_text(&self) -> String {
        let doc = self.load().await.unwrap_or_default();
        self.export_document(&doc)
    }

    /// Pretty-printed `doc` with export date and app version.
    #[must_use]
    pub fn export_document(&self, doc: &StudyDocument) -> String {
        let record = DocumentRecord::from_document(doc);
        let export = ExportRecord {
            document: &record,
            export_date: self.clock.now(),
            app_version: APP_VERSION,
        };
        serde_json::to_string_pretty(&export).unwrap_or_else(|err| {
            error!(%err, "failed to serialize export");
            String::from("{}")
        })
    }

    /// Decode an exported document, stamped with the current version.
    ///
    /// `None` if `text` is not a JSON object or lacks a required top-level
    /// field. Other fields are read leniently.
    #[must_use]
    pub fn parse_import(text: &str) -> Option<StudyDocument> {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "import is not valid JSON");
                return None;
            }
        };

        let Some(fields) = value.as_object() else {
            warn!("import is not a JSON object");
            return None;
        };
        if let Some(missing) = REQUIRED_IMPORT_FIELDS
            .iter()
            .find(|field| !fields.contains_key(**field))
        {
            warn!(field = *missing, "import is missing a required field");
            return None;
        }

        match serde_json::from_value::<DocumentRecord>(value) {
            Ok(record) => {
                let mut doc = record.into_document();
                doc.schema_version = CURRENT_SCHEMA_VERSION.to_string();
                Some(doc)
            }
            Err(err) => {
                warn!(%err, "import does not decode");
                None
            }
        }
    }

    /// Replace stored data with an exported document.
    ///
    /// Returns `false`, leaving storage untouched, if the text is rejected by
    /// [`DocumentStore::parse_import`].
    pub async fn import_from_text(&self, text: &str) -> bool {
        match Self::parse_import(text) {
            Some(doc) => self.save(DocumentPatch::from(doc)).await,
            None => false,
        }
    }
}

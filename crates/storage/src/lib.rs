#![forbid(unsafe_code)]

pub mod adapter;
pub mod document_store;
pub mod record;
pub mod repository;
pub mod sqlite;
pub mod writer;

pub use adapter::KvAdapter;
pub use document_store::{BackupInfo, DocumentStore};
pub use record::DocumentPatch;
pub use repository::{InMemoryKeyValueStore, KeyValueStore, StorageError};
pub use writer::DocumentWriter;

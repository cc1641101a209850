use std::sync::Arc;

use sentence_core::model::{Grade, SentenceId, StudyDocument};
use sentence_core::time::fixed_clock;
use storage::repository::KeyValueStore;
use storage::sqlite::SqliteRepository;
use storage::{DocumentPatch, DocumentStore};

#[tokio::test]
async fn sqlite_roundtrips_entries() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // Migrations are idempotent.
    repo.migrate().await.expect("migrate twice");

    repo.set("b", "2").await.unwrap();
    repo.set("a", "1").await.unwrap();
    repo.set("a", "one").await.unwrap();

    assert_eq!(repo.get("a").await.unwrap().as_deref(), Some("one"));
    assert_eq!(repo.get("missing").await.unwrap(), None);
    assert_eq!(repo.keys().await.unwrap(), vec!["a".to_string(), "b".to_string()]);

    repo.remove("a").await.unwrap();
    repo.remove("a").await.unwrap();
    assert_eq!(repo.keys().await.unwrap(), vec!["b".to_string()]);
}

#[tokio::test]
async fn sqlite_enforces_quota() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_quota?mode=memory&cache=shared")
        .await
        .expect("connect")
        .with_quota(Some(12));
    repo.migrate().await.expect("migrate");

    repo.set("key", "123456").await.unwrap();
    // Overwriting the same key does not double count it.
    repo.set("key", "123456789").await.unwrap();
    let err = repo.set("other", "x").await.unwrap_err();
    assert!(err.is_quota_exceeded());
}

#[tokio::test]
async fn document_store_over_sqlite() {
    let kv = SqliteRepository::open("sqlite:file:memdb_kv_document?mode=memory&cache=shared", None)
        .await
        .expect("open");
    let store = DocumentStore::new(Arc::clone(&kv), fixed_clock());

    let mut doc = StudyDocument::default();
    doc.mark_studied(Grade::High1, SentenceId::new("h1-001").unwrap());
    assert!(store.save(DocumentPatch::from(doc.clone())).await);

    let loaded = store.load().await.expect("document stored");
    assert_eq!(loaded.studied, doc.studied);

    let backup = store.create_backup().await.expect("backup");
    let listed = store.list_backups().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, backup);
}

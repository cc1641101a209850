use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sentence_core::catalog::InMemoryCatalog;
use sentence_core::model::{Grade, SentenceId};
use sentence_core::streak::StreakInfo;
use sentence_core::time::fixed_clock;
use services::{AppServices, CalendarZone};
use storage::document_store::MAIN_DOCUMENT_KEY;
use storage::repository::{InMemoryKeyValueStore, KeyValueStore};

fn ids(prefix: &str, count: usize) -> Vec<SentenceId> {
    (1..=count)
        .map(|n| SentenceId::new(format!("{prefix}-{n:03}")).unwrap())
        .collect()
}

fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(
        InMemoryCatalog::new()
            .with_sentences(Grade::Middle1, ids("m1", 10))
            .with_sentences(Grade::Middle2, ids("m2", 5))
            .with_count(Grade::High1, 3),
    )
}

fn utc() -> CalendarZone {
    CalendarZone::east_hours(0).unwrap()
}

fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, n, 9, 0, 0).unwrap()
}

async fn services_over(kv: &InMemoryKeyValueStore) -> AppServices {
    AppServices::open(Arc::new(kv.clone()), catalog(), fixed_clock(), utc()).await
}

#[tokio::test]
async fn repeated_study_counts_once() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();

    for _ in 0..5 {
        progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
    }

    let grade = progress.grade_progress(Grade::Middle1);
    assert_eq!(grade.studied_sentences, 1);
    assert_eq!(grade.total_sentences, 10);
    assert_eq!(grade.completion_rate, 10);
    assert!(progress.is_sentence_studied(Grade::Middle1, "m1-001"));
    assert!(!progress.is_sentence_studied(Grade::Middle2, "m1-001"));
}

#[tokio::test]
async fn overall_progress_aggregates_grades() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();

    for id in ["m1-001", "m1-002", "m1-003"] {
        progress.record_study_event_at(Grade::Middle1, id, day(1));
    }
    for id in ids("m2", 5) {
        progress.record_study_event_at(Grade::Middle2, id.as_str(), day(1));
    }

    let overall = progress.overall_progress();
    // High1 contributes 3 unstudied sentences; strip it to match the 10 + 5 example.
    let high1 = &overall.grade_progress[&Grade::High1];
    assert_eq!(high1.total_sentences, 3);
    assert_eq!(overall.total_sentences - high1.total_sentences, 15);
    assert_eq!(overall.total_studied_sentences, 8);
    assert_eq!(overall.grade_progress[&Grade::Middle2].completion_rate, 100);
    assert_eq!(overall.grade_progress.len(), Grade::ALL.len());
}

#[tokio::test]
async fn overall_rate_for_ten_and_five_example() {
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_sentences(Grade::Middle1, ids("m1", 10))
            .with_sentences(Grade::High3, ids("h3", 5)),
    );
    let services = AppServices::in_memory(catalog, fixed_clock(), utc()).await;
    let progress = services.progress();
    for id in ["m1-004", "m1-005", "m1-006"] {
        progress.record_study_event_at(Grade::Middle1, id, day(2));
    }
    for id in ids("h3", 5) {
        progress.record_study_event_at(Grade::High3, id.as_str(), day(2));
    }

    let overall = progress.overall_progress();
    assert_eq!(overall.total_sentences, 15);
    assert_eq!(overall.total_studied_sentences, 8);
    assert_eq!(overall.overall_completion_rate, 53);
}

#[tokio::test]
async fn grade_without_sentences_reports_zero_rate() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();
    progress.record_study_event_at(Grade::High3, "orphan", day(1));

    let grade = progress.grade_progress(Grade::High3);
    assert_eq!(grade.total_sentences, 0);
    assert_eq!(grade.completion_rate, 0);
    assert!(progress.is_sentence_studied(Grade::High3, "orphan"));
}

#[tokio::test]
async fn returned_progress_is_an_independent_copy() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();
    progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));

    let mut copy = progress.grade_progress(Grade::Middle1);
    copy.studied_sentences = 99;
    copy.completion_rate = 100;

    assert_eq!(progress.grade_progress(Grade::Middle1).studied_sentences, 1);
}

#[tokio::test]
async fn streak_follows_transition_table() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();

    progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
    assert_eq!(progress.current_streak(), 1);

    // Re-studying a known sentence later the same day still counts as studied today.
    progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
    assert_eq!(progress.current_streak(), 1);

    progress.record_study_event_at(Grade::Middle1, "m1-001", day(2));
    assert_eq!(progress.current_streak(), 2);

    progress.record_study_event_at(Grade::Middle2, "m2-001", day(4));
    let info = progress.streak_info();
    assert_eq!(info.current_streak, 1);
    assert_eq!(info.longest_streak, 2);
    assert!(info.longest_streak >= info.current_streak);

    let m2 = progress.grade_progress(Grade::Middle2);
    assert_eq!(m2.streak, 1);
    assert_eq!(m2.last_study_date, NaiveDate::from_ymd_opt(2024, 3, 4));
    let m1 = progress.grade_progress(Grade::Middle1);
    assert_eq!(m1.last_study_date, NaiveDate::from_ymd_opt(2024, 3, 2));
}

#[tokio::test]
async fn study_across_local_midnight_extends_streak() {
    let services = AppServices::in_memory(
        catalog(),
        fixed_clock(),
        CalendarZone::east_hours(9).unwrap(),
    )
    .await;
    let progress = services.progress();

    // 23:55 and 00:05 in Seoul.
    progress.record_study_event_at(
        Grade::Middle1,
        "m1-001",
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 55, 0).unwrap(),
    );
    progress.record_study_event_at(
        Grade::Middle1,
        "m1-002",
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 5, 0).unwrap(),
    );
    assert_eq!(progress.current_streak(), 2);
}

#[tokio::test]
async fn reset_grade_leaves_other_grades() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();
    progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
    progress.record_study_event_at(Grade::Middle1, "m1-002", day(1));
    progress.record_study_event_at(Grade::Middle2, "m2-001", day(1));

    progress.reset_grade_progress(Grade::Middle1);

    assert_eq!(progress.grade_progress(Grade::Middle1).studied_sentences, 0);
    assert_eq!(progress.grade_progress(Grade::Middle2).studied_sentences, 1);
    assert_eq!(progress.current_streak(), 1);
}

#[tokio::test]
async fn reset_all_clears_grades_and_streak() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();
    progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
    progress.record_study_event_at(Grade::Middle2, "m2-001", day(2));

    progress.reset_all_progress();

    for grade in Grade::ALL {
        assert_eq!(progress.grade_progress(grade).studied_sentences, 0);
    }
    assert_eq!(progress.streak_info(), StreakInfo::default());
    assert!(progress.studied_sentence_ids(Grade::Middle1).is_empty());
}

#[tokio::test]
async fn invalid_arguments_are_ignored() {
    let kv = InMemoryKeyValueStore::new();
    let services = services_over(&kv).await;
    let progress = services.progress();

    progress.record_study_event_at(Grade::Middle1, "   ", day(1));
    progress.record_study_event_raw("", "m1-001");
    progress.record_study_event_raw("college1", "m1-001");

    assert_eq!(progress.grade_progress(Grade::Middle1).studied_sentences, 0);
    assert_eq!(progress.streak_info(), StreakInfo::default());
    assert!(!progress.is_sentence_studied(Grade::Middle1, ""));

    progress.record_study_event_raw(" middle1 ", "m1-003");
    assert_eq!(
        progress.studied_sentence_ids(Grade::Middle1),
        vec![SentenceId::new("m1-003").unwrap()]
    );
}

#[tokio::test]
async fn studied_ids_missing_from_catalog_do_not_count() {
    let services = services_over(&InMemoryKeyValueStore::new()).await;
    let progress = services.progress();
    progress.record_study_event_at(Grade::Middle2, "m2-001", day(1));
    progress.record_study_event_at(Grade::Middle2, "retired-sentence", day(1));

    let grade = progress.grade_progress(Grade::Middle2);
    assert_eq!(grade.studied_sentences, 1);
    assert_eq!(grade.completion_rate, 20);
}

#[tokio::test]
async fn state_survives_restart() {
    let kv = InMemoryKeyValueStore::new();
    {
        let services = services_over(&kv).await;
        let progress = services.progress();
        progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
        progress.record_study_event_at(Grade::Middle1, "m1-002", day(2));
        services.important().mark("m1-002");
        services.flush().await;
    }

    let reopened = services_over(&kv).await;
    let progress = reopened.progress();
    assert_eq!(progress.grade_progress(Grade::Middle1).studied_sentences, 2);
    assert_eq!(progress.current_streak(), 2);
    assert!(reopened.important().is_important("m1-002"));

    let raw = kv.get(MAIN_DOCUMENT_KEY).await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["gradeProgress"]["middle1"]["completionRate"], 20);
    assert_eq!(stored["streakData"]["lastStudyDate"], "2024-03-02");
}

#[tokio::test]
async fn corrupt_stored_document_starts_fresh() {
    let kv = InMemoryKeyValueStore::new();
    kv.set(MAIN_DOCUMENT_KEY, "<<garbage>>").await.unwrap();

    let services = services_over(&kv).await;
    let progress = services.progress();
    assert_eq!(progress.overall_progress().total_studied_sentences, 0);

    progress.record_study_event_at(Grade::High1, "h1-001", day(1));
    services.flush().await;
    let raw = kv.get(MAIN_DOCUMENT_KEY).await.unwrap().unwrap();
    assert!(raw.contains("h1-001"));
}

#[tokio::test]
async fn mistyped_progress_cache_is_regenerated_on_open() {
    let kv = InMemoryKeyValueStore::new();
    kv.set(
        MAIN_DOCUMENT_KEY,
        r#"{"schemaVersion":"1.0.0",
            "studiedSentences":{"middle1":["m1-001","m1-002"]},
            "streakData":{"currentStreak":1,"longestStreak":1,"lastStudyDate":"2024-03-01"},
            "gradeProgress":{"middle1":{"completionRate":20.5,"studiedSentences":9}}}"#,
    )
    .await
    .unwrap();

    let services = services_over(&kv).await;
    let progress = services.progress();
    let middle1 = progress.grade_progress(Grade::Middle1);
    assert_eq!(middle1.studied_sentences, 2);
    assert_eq!(middle1.completion_rate, 20);
    assert_eq!(progress.current_streak(), 1);

    services.flush().await;
    let raw = kv.get(MAIN_DOCUMENT_KEY).await.unwrap().unwrap();
    assert!(raw.contains("m1-002"));
}

#[tokio::test]
async fn unavailable_storage_never_reaches_callers() {
    let kv = InMemoryKeyValueStore::new();
    kv.set_unavailable(true);

    let services = services_over(&kv).await;
    let progress = services.progress();
    progress.record_study_event_at(Grade::Middle1, "m1-001", day(1));
    services.flush().await;

    assert_eq!(progress.grade_progress(Grade::Middle1).studied_sentences, 1);
}

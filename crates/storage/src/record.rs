//! Persisted JSON shape of the study document.
//!
//! Readers never assume a field is present or well-typed: every field decodes
//! on its own and falls back to its default, `null` counts as missing, numeric
//! sentence ids are kept as their decimal text, and unknown grades or blank ids
//! are dropped on conversion to the domain type. Only a value that is not a
//! JSON object fails to decode.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use sentence_core::model::{
    AutoPlaySpeed, CURRENT_SCHEMA_VERSION, Grade, GradeProgress, SentenceId, StudyDocument,
    UserPreferences,
};
use sentence_core::streak::StreakInfo;

/// Top-level fields an imported document must carry.
pub const REQUIRED_IMPORT_FIELDS: [&str; 3] = ["schemaVersion", "studiedSentences", "streakData"];

/// Decode a field, using its default when the stored value has another shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|err| {
        warn!(%err, "stored field has an unexpected shape, using its default");
        T::default()
    }))
}

/// Decode a non-negative count, rounding fractional numbers.
fn lenient_count<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value)
        .and_then(|n| T::try_from(n).ok())
        .unwrap_or_default())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from_value(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}

/// Sentence ids as stored. Numbers are kept as their decimal text; other
/// non-string entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdList(pub Vec<String>);

impl IdList {
    fn from_value(value: Value) -> Self {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => return Self::default(),
            other => {
                warn!(value = %other, "stored id list is not an array, ignoring it");
                return Self::default();
            }
        };
        Self(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(id),
                    Value::Number(n) => Some(n.to_string()),
                    other => {
                        warn!(value = %other, "skipping stored sentence id that is not text");
                        None
                    }
                })
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for IdList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

impl FromIterator<String> for IdList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreakRecord {
    #[serde(deserialize_with = "lenient_count")]
    pub current_streak: u32,
    #[serde(deserialize_with = "lenient")]
    pub last_study_date: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub longest_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesRecord {
    #[serde(deserialize_with = "lenient")]
    pub auto_play_speed: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub tts_voice_index: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub sound_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub animations_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradeProgressRecord {
    #[serde(deserialize_with = "lenient_count")]
    pub total_sentences: usize,
    #[serde(deserialize_with = "lenient_count")]
    pub studied_sentences: usize,
    #[serde(deserialize_with = "lenient_count")]
    pub completion_rate: u8,
    #[serde(deserialize_with = "lenient_count")]
    pub streak: u32,
    #[serde(deserialize_with = "lenient")]
    pub last_study_date: Option<String>,
}

/// The complete-data document as stored under the main key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentRecord {
    #[serde(deserialize_with = "lenient")]
    pub schema_version: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub studied_sentences: BTreeMap<String, IdList>,
    #[serde(deserialize_with = "lenient")]
    pub streak_data: StreakRecord,
    pub important_sentences: IdList,
    #[serde(deserialize_with = "lenient")]
    pub user_preferences: PreferencesRecord,
    #[serde(deserialize_with = "lenient")]
    pub grade_progress: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient")]
    pub last_backup_date: Option<DateTime<Utc>>,
}

/// Export file: the document plus when and by which build it was written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord<'a> {
    #[serde(flatten)]
    pub document: &'a DocumentRecord,
    pub export_date: DateTime<Utc>,
    pub app_version: &'a str,
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn parse_grade_key(raw: &str) -> Option<Grade> {
    match Grade::parse(raw) {
        Ok(grade) => Some(grade),
        Err(err) => {
            warn!(%err, "skipping unknown grade in stored document");
            None
        }
    }
}

fn parse_ids(raw: IdList) -> BTreeSet<SentenceId> {
    raw.0
        .into_iter()
        .filter_map(|id| SentenceId::new(&id).ok())
        .collect()
}

impl DocumentRecord {
    #[must_use]
    pub fn from_document(doc: &StudyDocument) -> Self {
        let studied_sentences = doc
            .studied
            .iter()
            .map(|(grade, ids)| {
                (
                    grade.as_str().to_string(),
                    ids.iter().map(|id| id.as_str().to_string()).collect(),
                )
            })
            .collect();

        let grade_progress = doc
            .grade_progress
            .iter()
            .map(|(grade, progress)| {
                let record = GradeProgressRecord {
                    total_sentences: progress.total_sentences,
                    studied_sentences: progress.studied_sentences,
                    completion_rate: progress.completion_rate,
                    streak: progress.streak,
                    last_study_date: progress.last_study_date.map(format_date),
                };
                let value = serde_json::to_value(record).unwrap_or_default();
                (grade.as_str().to_string(), value)
            })
            .collect();

        let prefs = doc.preferences;
        let speed = match prefs.auto_play_speed() {
            AutoPlaySpeed::Slow => "slow",
            AutoPlaySpeed::Normal => "normal",
            AutoPlaySpeed::Fast => "fast",
        };

        Self {
            schema_version: Some(doc.schema_version.clone()),
            studied_sentences,
            streak_data: StreakRecord {
                current_streak: doc.streak.current_streak,
                last_study_date: doc.streak.last_study_date.map(format_date),
                longest_streak: doc.streak.longest_streak,
            },
            important_sentences: doc
                .important
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            user_preferences: PreferencesRecord {
                auto_play_speed: Some(speed.to_string()),
                tts_voice_index: Some(prefs.tts_voice_index()),
                sound_enabled: Some(prefs.sound_enabled()),
                animations_enabled: Some(prefs.animations_enabled()),
            },
            grade_progress,
            last_backup_date: doc.last_backup_date,
        }
    }

    /// Convert into the domain document, defaulting anything missing.
    #[must_use]
    pub fn into_document(self) -> StudyDocument {
        let mut studied: BTreeMap<Grade, BTreeSet<SentenceId>> = BTreeMap::new();
        for (key, ids) in self.studied_sentences {
            if let Some(grade) = parse_grade_key(&key) {
                studied.entry(grade).or_default().extend(parse_ids(ids));
            }
        }

        // The cache only contributes each grade's last study date; counts and
        // rates are recomputed from the studied sets.
        let grade_progress = self
            .grade_progress
            .into_iter()
            .filter_map(|(key, raw)| {
                let grade = parse_grade_key(&key)?;
                let record: GradeProgressRecord =
                    serde_json::from_value(raw).unwrap_or_default();
                let last_study_date = record.last_study_date.as_deref().and_then(parse_date);
                Some((
                    grade,
                    GradeProgress {
                        last_study_date,
                        ..GradeProgress::empty()
                    },
                ))
            })
            .collect();

        let streak = StreakInfo::from_persisted(
            self.streak_data.current_streak,
            self.streak_data.longest_streak,
            self.streak_data
                .last_study_date
                .as_deref()
                .and_then(parse_date),
        );

        let defaults = UserPreferences::default();
        let prefs = self.user_preferences;
        let preferences = UserPreferences::from_persisted(
            prefs
                .auto_play_speed
                .as_deref()
                .and_then(AutoPlaySpeed::parse)
                .unwrap_or(defaults.auto_play_speed()),
            prefs.tts_voice_index.unwrap_or(defaults.tts_voice_index()),
            prefs.sound_enabled.unwrap_or(defaults.sound_enabled()),
            prefs
                .animations_enabled
                .unwrap_or(defaults.animations_enabled()),
        );

        StudyDocument {
            schema_version: self
                .schema_version
                .unwrap_or_else(|| CURRENT_SCHEMA_VERSION.to_string()),
            studied,
            streak,
            important: parse_ids(self.important_sentences),
            preferences,
            grade_progress,
            last_backup_date: self.last_backup_date,
        }
    }
}

/// A save request: each set field replaces the default for that field group.
///
/// Unset fields are written as defaults, not taken from the stored document,
/// so callers pass complete state for every group they own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub schema_version: Option<String>,
    pub studied: Option<BTreeMap<Grade, BTreeSet<SentenceId>>>,
    pub streak: Option<StreakInfo>,
    pub important: Option<BTreeSet<SentenceId>>,
    pub preferences: Option<UserPreferences>,
    pub grade_progress: Option<BTreeMap<Grade, GradeProgress>>,
}

impl DocumentPatch {
    /// Merge over a default document, stamping `saved_at` as the backup date.
    #[must_use]
    pub fn merge_over_defaults(self, saved_at: DateTime<Utc>) -> StudyDocument {
        let mut doc = StudyDocument::default();
        if let Some(version) = self.schema_version {
            doc.schema_version = version;
        }
        if let Some(studied) = self.studied {
            doc.studied = studied;
        }
        if let Some(streak) = self.streak {
            doc.streak = streak;
        }
        if let Some(important) = self.important {
            doc.important = important;
        }
        if let Some(preferences) = self.preferences {
            doc.preferences = preferences;
        }
        if let Some(grade_progress) = self.grade_progress {
            doc.grade_progress = grade_progress;
        }
        doc.last_backup_date = Some(saved_at);
        doc
    }
}

impl From<StudyDocument> for DocumentPatch {
    fn from(doc: StudyDocument) -> Self {
        Self {
            schema_version: Some(doc.schema_version),
            studied: Some(doc.studied),
            streak: Some(doc.streak),
            important: Some(doc.important),
            preferences: Some(doc.preferences),
            grade_progress: Some(doc.grade_progress),
        }
    }
}

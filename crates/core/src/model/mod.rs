mod document;
mod ids;
mod preferences;
mod progress;

pub use document::{CURRENT_SCHEMA_VERSION, StudyDocument};
pub use ids::{Grade, IdError, SentenceId};
pub use preferences::{
    AutoPlaySpeed, MAX_TTS_VOICE_INDEX, PreferencesError, UserPreferences, UserPreferencesDraft,
};
pub use progress::{GradeProgress, OverallProgress, completion_rate};

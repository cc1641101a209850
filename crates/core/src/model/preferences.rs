use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest voice index accepted from the UI's voice picker.
pub const MAX_TTS_VOICE_INDEX: u32 = 255;

/// Playback pace for automatic card advance and speech.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoPlaySpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl AutoPlaySpeed {
    /// Speech rate multiplier handed to the speech capability.
    #[must_use]
    pub fn speech_rate(&self) -> f32 {
        match self {
            AutoPlaySpeed::Slow => 0.7,
            AutoPlaySpeed::Normal => 1.0,
            AutoPlaySpeed::Fast => 1.3,
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slow" => Some(Self::Slow),
            "normal" => Some(Self::Normal),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserPreferences {
    auto_play_speed: AutoPlaySpeed,
    tts_voice_index: u32,
    sound_enabled: bool,
    animations_enabled: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UserPreferencesDraft {
    pub auto_play_speed: Option<AutoPlaySpeed>,
    pub tts_voice_index: Option<u32>,
    pub sound_enabled: Option<bool>,
    pub animations_enabled: Option<bool>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PreferencesError {
    #[error("voice index {0} is out of range (max {MAX_TTS_VOICE_INDEX})")]
    InvalidVoiceIndex(u32),
}

impl UserPreferencesDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the draft's set fields on top of `base`.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError` if the voice index is out of range.
    pub fn apply_to(self, base: UserPreferences) -> Result<UserPreferences, PreferencesError> {
        let tts_voice_index = self.tts_voice_index.unwrap_or(base.tts_voice_index);
        if tts_voice_index > MAX_TTS_VOICE_INDEX {
            return Err(PreferencesError::InvalidVoiceIndex(tts_voice_index));
        }

        Ok(UserPreferences {
            auto_play_speed: self.auto_play_speed.unwrap_or(base.auto_play_speed),
            tts_voice_index,
            sound_enabled: self.sound_enabled.unwrap_or(base.sound_enabled),
            animations_enabled: self.animations_enabled.unwrap_or(base.animations_enabled),
        })
    }

    /// Validate the draft against the defaults.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError` if the voice index is out of range.
    pub fn validate(self) -> Result<UserPreferences, PreferencesError> {
        self.apply_to(UserPreferences::default())
    }
}

impl UserPreferences {
    /// Rebuild preferences from stored values, clamping the voice index.
    #[must_use]
    pub fn from_persisted(
        auto_play_speed: AutoPlaySpeed,
        tts_voice_index: u32,
        sound_enabled: bool,
        animations_enabled: bool,
    ) -> Self {
        Self {
            auto_play_speed,
            tts_voice_index: tts_voice_index.min(MAX_TTS_VOICE_INDEX),
            sound_enabled,
            animations_enabled,
        }
    }

    #[must_use]
    pub fn auto_play_speed(&self) -> AutoPlaySpeed {
        self.auto_play_speed
    }

    #[must_use]
    pub fn tts_voice_index(&self) -> u32 {
        self.tts_voice_index
    }

    #[must_use]
    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    #[must_use]
    pub fn animations_enabled(&self) -> bool {
        self.animations_enabled
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            auto_play_speed: AutoPlaySpeed::Normal,
            tts_voice_index: 0,
            sound_enabled: true,
            animations_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let prefs = UserPreferencesDraft::new().validate().unwrap();
        assert_eq!(prefs, UserPreferences::default());
        assert!(prefs.sound_enabled());
        assert_eq!(prefs.auto_play_speed(), AutoPlaySpeed::Normal);
    }

    #[test]
    fn draft_only_overrides_set_fields() {
        let base = UserPreferencesDraft {
            tts_voice_index: Some(3),
            ..UserPreferencesDraft::default()
        }
        .validate()
        .unwrap();

        let updated = UserPreferencesDraft {
            sound_enabled: Some(false),
            ..UserPreferencesDraft::default()
        }
        .apply_to(base)
        .unwrap();

        assert_eq!(updated.tts_voice_index(), 3);
        assert!(!updated.sound_enabled());
        assert!(updated.animations_enabled());
    }

    #[test]
    fn rejects_out_of_range_voice() {
        let err = UserPreferencesDraft {
            tts_voice_index: Some(MAX_TTS_VOICE_INDEX + 1),
            ..UserPreferencesDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, PreferencesError::InvalidVoiceIndex(256));
    }

    #[test]
    fn from_persisted_clamps_voice() {
        let prefs = UserPreferences::from_persisted(AutoPlaySpeed::Fast, 9_000, false, false);
        assert_eq!(prefs.tts_voice_index(), MAX_TTS_VOICE_INDEX);
    }

    #[test]
    fn speed_parse_and_rate() {
        assert_eq!(AutoPlaySpeed::parse(" FAST"), Some(AutoPlaySpeed::Fast));
        assert_eq!(AutoPlaySpeed::parse("warp"), None);
        assert!(AutoPlaySpeed::Slow.speech_rate() < AutoPlaySpeed::Fast.speech_rate());
    }
}

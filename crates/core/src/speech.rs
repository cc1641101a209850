//! Contract for the text-to-speech capability used by the card view.
//!
//! Progress and streak logic never call this; it lives here so UI adapters
//! share one error type they can react to.

use async_trait::async_trait;
use thiserror::Error;

/// Language of the text to pronounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechLanguage {
    English,
    Korean,
}

impl SpeechLanguage {
    /// BCP 47 tag passed to platform voices.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            SpeechLanguage::English => "en-US",
            SpeechLanguage::Korean => "ko-KR",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpeechError {
    #[error("speech synthesis is not supported on this device")]
    Unsupported,

    #[error("speech was interrupted")]
    Interrupted,

    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

impl SpeechError {
    /// Whether trying the same utterance again can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SpeechError::Unsupported)
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` and resolve once playback ends.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if playback is unsupported, interrupted or fails.
    async fn speak(&self, text: &str, language: SpeechLanguage, rate: f32)
    -> Result<(), SpeechError>;

    /// Stop any utterance in progress.
    fn stop(&self);

    fn is_supported(&self) -> bool;
}

/// Synthesizer for environments without audio output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSynthesizer;

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn speak(
        &self,
        _text: &str,
        _language: SpeechLanguage,
        _rate: f32,
    ) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }

    fn stop(&self) {}

    fn is_supported(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unsupported_is_final() {
        assert!(!SpeechError::Unsupported.is_retryable());
        assert!(SpeechError::Interrupted.is_retryable());
        assert!(SpeechError::Failed("device busy".into()).is_retryable());
    }

    #[test]
    fn language_tags() {
        assert_eq!(SpeechLanguage::English.tag(), "en-US");
        assert_eq!(SpeechLanguage::Korean.tag(), "ko-KR");
    }

    #[tokio::test]
    async fn silent_synthesizer_reports_unsupported() {
        let tts = SilentSynthesizer;
        assert!(!tts.is_supported());
        let err = tts
            .speak("Hello", SpeechLanguage::English, 1.0)
            .await
            .unwrap_err();
        assert_eq!(err, SpeechError::Unsupported);
        tts.stop();
    }
}

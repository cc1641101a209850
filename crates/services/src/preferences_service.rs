use std::sync::Arc;

use sentence_core::model::{UserPreferences, UserPreferencesDraft};
use tracing::info;

use crate::error::PreferencesServiceError;
use crate::study_session::StudySession;

#[derive(Clone)]
pub struct PreferencesService {
    session: Arc<StudySession>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(session: Arc<StudySession>) -> Self {
        Self { session }
    }

    /// Current preferences (defaults if never changed).
    #[must_use]
    pub fn preferences(&self) -> UserPreferences {
        self.session.read(|state| state.document.preferences)
    }

    /// Validate the draft over the current preferences and persist them.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError` if validation fails; nothing is
    /// changed in that case.
    pub fn update(
        &self,
        draft: UserPreferencesDraft,
    ) -> Result<UserPreferences, PreferencesServiceError> {
        let updated = draft.apply_to(self.preferences())?;
        self.session
            .mutate(|state| state.document.preferences = updated);
        info!(?updated, "preferences updated");
        Ok(updated)
    }
}

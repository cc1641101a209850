use std::sync::Arc;

use sentence_core::model::SentenceId;
use tracing::{debug, error};

use crate::study_session::StudySession;

/// User-curated "important" sentences, independent of study state.
#[derive(Clone)]
pub struct ImportantSentencesService {
    session: Arc<StudySession>,
}

fn parse_id(raw: &str) -> Option<SentenceId> {
    match SentenceId::new(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            error!(%err, "ignoring important-sentence change");
            None
        }
    }
}

impl ImportantSentencesService {
    #[must_use]
    pub fn new(session: Arc<StudySession>) -> Self {
        Self { session }
    }

    pub fn mark(&self, sentence_id: &str) {
        let Some(id) = parse_id(sentence_id) else {
            return;
        };
        self.session.mutate(|state| state.document.important.insert(id));
    }

    pub fn unmark(&self, sentence_id: &str) {
        let Some(id) = parse_id(sentence_id) else {
            return;
        };
        self.session.mutate(|state| state.document.important.remove(&id));
    }

    /// Flip the mark and return whether the sentence is now important.
    pub fn toggle(&self, sentence_id: &str) -> bool {
        let Some(id) = parse_id(sentence_id) else {
            return false;
        };
        let now_important = self.session.mutate(|state| {
            let important = &mut state.document.important;
            if important.remove(&id) {
                false
            } else {
                important.insert(id.clone());
                true
            }
        });
        debug!(sentence = %id, now_important, "important mark toggled");
        now_important
    }

    #[must_use]
    pub fn is_important(&self, sentence_id: &str) -> bool {
        let Ok(id) = SentenceId::new(sentence_id) else {
            return false;
        };
        self.session
            .read(|state| state.document.important.contains(&id))
    }

    /// All important sentence ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<SentenceId> {
        self.session
            .read(|state| state.document.important.iter().cloned().collect())
    }
}

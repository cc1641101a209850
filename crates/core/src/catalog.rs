//! Read-only access to the sentence content that progress is measured against.

use std::collections::BTreeMap;

use crate::model::{Grade, SentenceId};

/// Supplies the denominator for completion math.
pub trait SentenceCatalog: Send + Sync {
    /// Number of sentences available in `grade`.
    fn sentence_count(&self, grade: Grade) -> usize;

    /// Identifiers of the sentences in `grade`.
    ///
    /// Catalogs that only know counts may return an empty list.
    fn sentence_ids(&self, grade: Grade) -> Vec<SentenceId>;
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    ids: BTreeMap<Grade, Vec<SentenceId>>,
    counts: BTreeMap<Grade, usize>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sentence ids of one grade, dropping duplicates.
    #[must_use]
    pub fn with_sentences(mut self, grade: Grade, ids: impl IntoIterator<Item = SentenceId>) -> Self {
        let mut list: Vec<SentenceId> = Vec::new();
        for id in ids {
            if !list.contains(&id) {
                list.push(id);
            }
        }
        self.counts.insert(grade, list.len());
        self.ids.insert(grade, list);
        self
    }

    /// Register only a sentence count for `grade`, without ids.
    #[must_use]
    pub fn with_count(mut self, grade: Grade, count: usize) -> Self {
        self.ids.remove(&grade);
        self.counts.insert(grade, count);
        self
    }
}

impl SentenceCatalog for InMemoryCatalog {
    fn sentence_count(&self, grade: Grade) -> usize {
        self.counts.get(&grade).copied().unwrap_or(0)
    }

    fn sentence_ids(&self, grade: Grade) -> Vec<SentenceId> {
        self.ids.get(&grade).cloned().unwrap_or_default()
    }
}

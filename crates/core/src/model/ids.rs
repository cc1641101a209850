use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when parsing identifiers from untrusted strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("sentence id cannot be empty")]
    EmptySentenceId,

    #[error("unknown grade: {0:?}")]
    UnknownGrade(String),
}

/// One of the six fixed proficiency levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Middle1,
    Middle2,
    Middle3,
    High1,
    High2,
    High3,
}

impl Grade {
    /// Every grade, in curriculum order.
    pub const ALL: [Grade; 6] = [
        Grade::Middle1,
        Grade::Middle2,
        Grade::Middle3,
        Grade::High1,
        Grade::High2,
        Grade::High3,
    ];

    /// Stable key used in persisted documents.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Middle1 => "middle1",
            Grade::Middle2 => "middle2",
            Grade::Middle3 => "middle3",
            Grade::High1 => "high1",
            Grade::High2 => "high2",
            Grade::High3 => "high3",
        }
    }

    /// Korean display label shown next to the grade picker.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Grade::Middle1 => "중학교 1학년",
            Grade::Middle2 => "중학교 2학년",
            Grade::Middle3 => "중학교 3학년",
            Grade::High1 => "고등학교 1학년",
            Grade::High2 => "고등학교 2학년",
            Grade::High3 => "고등학교 3학년",
        }
    }

    /// Parse a grade key, tolerating surrounding whitespace and case.
    ///
    /// # Errors
    ///
    /// Returns `IdError::UnknownGrade` for empty or unrecognized input.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let key = raw.trim().to_ascii_lowercase();
        Grade::ALL
            .into_iter()
            .find(|grade| grade.as_str() == key)
            .ok_or_else(|| IdError::UnknownGrade(raw.to_string()))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::parse(s)
    }
}

/// Stable identifier for a sentence, scoped to one grade.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentenceId(String);

impl SentenceId {
    /// Creates a new `SentenceId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IdError::EmptySentenceId` if nothing remains after trimming.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptySentenceId);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SentenceId({})", self.0)
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SentenceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SentenceId::new(s)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

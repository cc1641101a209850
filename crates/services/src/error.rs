//! Shared error types for the services crate.

use thiserror::Error;

use sentence_core::model::PreferencesError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `PreferencesService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesServiceError {
    #[error(transparent)]
    Invalid(#[from] PreferencesError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

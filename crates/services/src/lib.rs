#![forbid(unsafe_code)]

pub mod app_services;
pub mod data_service;
pub mod error;
pub mod important_service;
pub mod preferences_service;
pub mod progress_tracker;
pub mod study_session;

pub use sentence_core::{CalendarZone, Clock};

pub use app_services::AppServices;
pub use data_service::DataService;
pub use error::{AppServicesError, PreferencesServiceError};
pub use important_service::ImportantSentencesService;
pub use preferences_service::PreferencesService;
pub use progress_tracker::ProgressTracker;
pub use study_session::StudySession;

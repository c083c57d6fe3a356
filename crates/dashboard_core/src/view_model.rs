use festival_client::{ErrorCategory, StreamError};

use crate::state::Phase;
use crate::summary::ResultSummary;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub request_label: Option<String>,
    /// 0..=100, monotonic while a request runs.
    pub progress_percent: u8,
    pub status_message: String,
    /// Distinct status messages of the current request, oldest first.
    pub status_history: Vec<String>,
    pub result: Option<ResultSummary>,
    pub error: Option<ErrorView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&StreamError> for ErrorView {
    fn from(error: &StreamError) -> Self {
        let message = match error.category() {
            // Backend messages are meant for the user as they are.
            ErrorCategory::Application => error.message.clone(),
            _ => error.to_string(),
        };
        Self {
            category: error.category(),
            message,
        }
    }
}

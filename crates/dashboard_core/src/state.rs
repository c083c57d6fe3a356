use festival_client::{Operation, ProgressEvent, RequestId, StreamError};

use crate::summary::ResultSummary;
use crate::view_model::{AppViewModel, ErrorView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveRequest {
    request_id: RequestId,
    operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    phase: Phase,
    next_request_id: RequestId,
    active: Option<ActiveRequest>,
    label: Option<String>,
    progress_percent: u8,
    status_message: String,
    status_history: Vec<String>,
    result: Option<ResultSummary>,
    error: Option<ErrorView>,
    save_results: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose completed analyses also produce a save effect.
    pub fn with_saving(save_results: bool) -> Self {
        Self {
            save_results,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn saves_results(&self) -> bool {
        self.save_results
    }

    /// Request currently streaming, if any.
    pub fn active_request(&self) -> Option<RequestId> {
        self.active.as_ref().map(|active| active.request_id)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            request_label: self.label.clone(),
            progress_percent: self.progress_percent,
            status_message: self.status_message.clone(),
            status_history: self.status_history.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_active(&self, request_id: RequestId) -> bool {
        self.active_request() == Some(request_id)
    }

    pub(crate) fn begin(&mut self, operation: Operation) -> RequestId {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.phase = Phase::Running;
        self.label = Some(operation.label());
        self.active = Some(ActiveRequest {
            request_id,
            operation,
        });
        self.progress_percent = 0;
        self.status_message = "waiting for server".to_string();
        self.status_history.clear();
        self.result = None;
        self.error = None;
        self.dirty = true;
        request_id
    }

    pub(crate) fn apply_progress(&mut self, event: &ProgressEvent) {
        // Bar never moves backwards, even if the backend restarts its count.
        self.progress_percent = self.progress_percent.max(event.display_percent());
        let message = event.message.trim();
        if !message.is_empty() && self.status_history.last().map(String::as_str) != Some(message)
        {
            self.status_history.push(message.to_string());
            self.status_message = message.to_string();
        }
        self.dirty = true;
    }

    /// Ends the active request, handing back the operation it ran.
    pub(crate) fn finish_active(&mut self) -> Option<Operation> {
        self.active.take().map(|active| active.operation)
    }

    pub(crate) fn complete(&mut self, summary: ResultSummary) {
        self.phase = Phase::Completed;
        self.progress_percent = 100;
        self.status_message = "analysis complete".to_string();
        self.result = Some(summary);
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, error: &StreamError) {
        self.phase = Phase::Failed;
        self.status_message = "analysis failed".to_string();
        self.error = Some(ErrorView::from(error));
        self.dirty = true;
    }

    pub(crate) fn cancel(&mut self) {
        self.phase = Phase::Cancelled;
        self.status_message = "cancelled".to_string();
        self.dirty = true;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self {
            next_request_id: self.next_request_id,
            save_results: self.save_results,
            dirty: true,
            ..Self::default()
        };
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one analysis request issued through the engine handle.
pub type RequestId = u64;

/// Point-in-time status update of a running analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Fractional completion; the backend emits values in `[0, 1]` but nothing enforces it.
    pub percent: f64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(percent: f64, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }

    /// Completion clamped to `[0, 1]`; NaN counts as no progress.
    pub fn clamped(&self) -> f64 {
        if self.percent.is_nan() {
            0.0
        } else {
            self.percent.clamp(0.0, 1.0)
        }
    }

    /// Completion as a whole percentage for progress bars.
    pub fn display_percent(&self) -> u8 {
        (self.clamped() * 100.0).round() as u8
    }
}

/// One item of a streamed analysis, in wire order.
///
/// `Result` and `Failed` are terminal: a stream yields at most one of them and
/// nothing after it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress(ProgressEvent),
    Result(Value),
    Failed(StreamError),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Progress(_))
    }
}

/// Terminal outcome of one streamed analysis.
pub type StreamOutcome = Result<Value, StreamError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl StreamError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// A line after the marker was not a valid frame, or the body ended early.
    Protocol,
    /// The backend reported the failure itself through an `error` frame.
    Application,
    Cancelled,
}

impl FailureKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FailureKind::InvalidUrl
            | FailureKind::HttpStatus(_)
            | FailureKind::Timeout
            | FailureKind::Network => ErrorCategory::Transport,
            FailureKind::Protocol => ErrorCategory::Protocol,
            FailureKind::Application => ErrorCategory::Application,
            FailureKind::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Protocol => write!(f, "protocol error"),
            FailureKind::Application => write!(f, "analysis failed"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Protocol,
    Application,
    Cancelled,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Application => "application",
            ErrorCategory::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Event published by [`crate::EngineHandle`] for a running request.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub request_id: RequestId,
    pub event: StreamEvent,
}

/// Deserializes a result payload into an operation-specific type.
pub fn decode_result<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, StreamError> {
    serde_json::from_value(data).map_err(|err| {
        StreamError::new(
            FailureKind::Protocol,
            format!("unexpected result shape: {err}"),
        )
    })
}

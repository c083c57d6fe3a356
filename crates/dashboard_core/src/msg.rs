use festival_client::{Operation, ProgressEvent, RequestId, StreamError};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked for an analysis.
    Submit(Operation),
    /// Engine progress for a request.
    Progress {
        request_id: RequestId,
        event: ProgressEvent,
    },
    /// Engine delivered the result payload of a request.
    Completed { request_id: RequestId, data: Value },
    /// Engine reported a terminal failure for a request.
    Failed {
        request_id: RequestId,
        error: StreamError,
    },
    /// User clicked Cancel (or pressed Ctrl-C).
    CancelClicked,
    /// Back to an empty page, cancelling anything in flight.
    Reset,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

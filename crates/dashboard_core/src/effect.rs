use festival_client::{Operation, RequestId};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartAnalysis {
        request_id: RequestId,
        operation: Operation,
    },
    CancelAnalysis {
        request_id: RequestId,
    },
    SaveResult {
        operation: Operation,
        data: Value,
    },
}

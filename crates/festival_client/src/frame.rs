use client_logging::{client_debug, client_trace, client_warn};
use serde::Deserialize;
use serde_json::Value;

use crate::{FailureKind, ProgressEvent, StreamError, StreamEvent};

/// Line prefix that marks a line as carrying a frame.
pub const DEFAULT_MARKER: &str = "data:";

/// Message reported when a marked line does not hold a valid frame.
pub const PARSE_FAILURE_MESSAGE: &str = "failed to parse stream frame";

const APPLICATION_FAILURE_FALLBACK: &str = "analysis failed";

/// Wire envelope of one frame, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Progress {
        percent: f64,
        #[serde(default)]
        message: String,
    },
    Result {
        #[serde(default)]
        data: Value,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    /// Any other `type`; skipped so newer backends stay readable.
    #[serde(other)]
    Unknown,
}

impl Frame {
    pub fn into_event(self) -> Option<StreamEvent> {
        match self {
            Frame::Progress { percent, message } => {
                Some(StreamEvent::Progress(ProgressEvent { percent, message }))
            }
            Frame::Result { data } => Some(StreamEvent::Result(data)),
            Frame::Error { message } => {
                let message = if message.trim().is_empty() {
                    APPLICATION_FAILURE_FALLBACK.to_string()
                } else {
                    message
                };
                Some(StreamEvent::Failed(StreamError::new(
                    FailureKind::Application,
                    message,
                )))
            }
            Frame::Unknown => None,
        }
    }
}

/// Splits decoded text into lines and extracts frames from marked lines.
///
/// The trailing partial line is kept until more text or [`finish`](Self::finish)
/// completes it.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    marker: String,
    buffer: String,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl FrameDecoder {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            buffer: String::new(),
        }
    }

    /// Appends text and returns the frames of every line it completed, in order.
    pub fn push(&mut self, text: &str) -> Vec<Result<Frame, StreamError>> {
        self.buffer.push_str(text);
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Treats whatever is left in the buffer as a final, unterminated line.
    pub fn finish(&mut self) -> Option<Result<Frame, StreamError>> {
        let tail = std::mem::take(&mut self.buffer);
        self.parse_line(tail.trim_end_matches('\r'))
    }

    /// Bytes of text waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn parse_line(&self, line: &str) -> Option<Result<Frame, StreamError>> {
        let Some(payload) = line.strip_prefix(self.marker.as_str()) else {
            if !line.trim().is_empty() {
                client_trace!("ignoring unmarked line ({} bytes)", line.len());
            }
            return None;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        client_trace!("frame payload: {}", payload);
        let parsed = serde_json::from_str::<Frame>(payload).map_err(|err| {
            client_warn!("malformed frame ({} bytes): {}", payload.len(), err);
            StreamError::new(FailureKind::Protocol, PARSE_FAILURE_MESSAGE)
        });
        if let Ok(Frame::Unknown) = parsed {
            client_debug!("skipping frame of unknown type");
        }
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn complete_lines_yield_frames_and_partial_line_is_kept() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push(
            "data:{\"type\":\"progress\",\"percent\":0.5,\"message\":\"half\"}\ndata:{\"type\":",
        );
        assert_eq!(
            frames,
            vec![Ok(Frame::Progress {
                percent: 0.5,
                message: "half".to_string()
            })]
        );
        assert!(decoder.pending_len() > 0);

        let frames = decoder.push("\"result\",\"data\":{\"n\":1}}\n");
        assert_eq!(frames, vec![Ok(Frame::Result { data: json!({"n": 1}) })]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn space_after_marker_and_crlf_are_tolerated() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push("data: {\"type\":\"error\",\"message\":\"boom\"}\r\n\r\n");
        assert_eq!(
            frames,
            vec![Ok(Frame::Error {
                message: "boom".to_string()
            })]
        );
    }

    #[test]
    fn unmarked_and_blank_lines_are_ignored() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push(": keep-alive\n\nevent: progress\nid: 7\ndata:\ndata:   \n");
        assert!(frames.is_empty());
    }

    #[test]
    fn malformed_payload_is_a_protocol_error() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push("data:{not json}\n");
        assert_eq!(frames.len(), 1);
        let err = frames[0].clone().unwrap_err();
        assert_eq!(err.kind, FailureKind::Protocol);
        assert_eq!(err.message, PARSE_FAILURE_MESSAGE);
    }

    #[test]
    fn progress_without_percent_is_malformed() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push("data:{\"type\":\"progress\",\"message\":\"x\"}\n");
        assert!(frames[0].is_err());
    }

    #[test]
    fn unknown_type_is_skipped_by_event_conversion() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push("data:{\"type\":\"heartbeat\"}\n");
        assert_eq!(frames, vec![Ok(Frame::Unknown)]);
        assert_eq!(Frame::Unknown.into_event(), None);
    }

    #[test]
    fn finish_flushes_unterminated_tail() {
        let mut decoder = FrameDecoder::default();
        assert!(decoder
            .push("data:{\"type\":\"result\",\"data\":[1,2]}")
            .is_empty());
        assert_eq!(
            decoder.finish(),
            Some(Ok(Frame::Result { data: json!([1, 2]) }))
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn integer_percent_is_accepted() {
        let mut decoder = FrameDecoder::default();
        let frames = decoder.push("data: {\"type\":\"progress\",\"percent\":1,\"message\":\"done\"}\n");
        let event = frames[0].clone().unwrap().into_event().unwrap();
        assert_eq!(event, StreamEvent::Progress(ProgressEvent::new(1.0, "done")));
    }

    #[test]
    fn empty_error_message_gets_fallback_text() {
        let event = Frame::Error {
            message: String::new(),
        }
        .into_event()
        .unwrap();
        match event {
            StreamEvent::Failed(err) => {
                assert_eq!(err.kind, FailureKind::Application);
                assert_eq!(err.message, "analysis failed");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn custom_marker() {
        let mut decoder = FrameDecoder::new("frame>");
        let frames = decoder.push("data:{\"type\":\"result\"}\nframe>{\"type\":\"result\"}\n");
        assert_eq!(frames, vec![Ok(Frame::Result { data: Value::Null })]);
    }
}

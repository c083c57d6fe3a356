use std::collections::VecDeque;
use std::sync::mpsc;
use std::time::Duration;

use bytes::Bytes;
use client_logging::{client_debug, client_info, client_warn};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::decode::TextStreamDecoder;
use crate::frame::{FrameDecoder, DEFAULT_MARKER};
use crate::{
    EngineEvent, FailureKind, Operation, ProgressEvent, RequestId, StreamError, StreamEvent,
    StreamOutcome,
};

/// Message of the protocol failure reported when the body ends without a terminal frame.
pub const MISSING_TERMINAL_MESSAGE: &str = "stream ended before a result was received";

/// Lazy, finite, non-restartable sequence of events for one request.
pub type EventStream = BoxStream<'static, StreamEvent>;

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request deadline. Analyses routinely run for minutes, so none by default.
    pub request_timeout: Option<Duration>,
    pub marker: String,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl StreamSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<reqwest::Url, StreamError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        reqwest::Url::parse(&joined)
            .map_err(|err| StreamError::new(FailureKind::InvalidUrl, format!("{joined}: {err}")))
    }
}

/// Receiver of the events of one streamed request.
///
/// `on_progress` may fire any number of times, always before the single call
/// to either `on_result` or `on_error`.
pub trait EventSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
    fn on_result(&self, data: Value);
    fn on_error(&self, error: StreamError);
}

/// Forwards events, tagged with their request, to a channel.
pub struct ChannelEventSink {
    request_id: RequestId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(request_id: RequestId, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { request_id, tx }
    }

    fn send(&self, event: StreamEvent) {
        let _ = self.tx.send(EngineEvent {
            request_id: self.request_id,
            event,
        });
    }
}

impl EventSink for ChannelEventSink {
    fn on_progress(&self, event: ProgressEvent) {
        self.send(StreamEvent::Progress(event));
    }

    fn on_result(&self, data: Value) {
        self.send(StreamEvent::Result(data));
    }

    fn on_error(&self, error: StreamError) {
        self.send(StreamEvent::Failed(error));
    }
}

#[async_trait::async_trait]
pub trait StreamClient: Send + Sync {
    /// POSTs `body` to `endpoint` and yields the decoded events in wire order.
    ///
    /// Nothing is sent until the stream is first polled. The stream ends right
    /// after its terminal event, or silently once `cancel` fires.
    fn events(&self, endpoint: &str, body: Value, cancel: CancellationToken) -> EventStream;

    /// Callback form of [`events`](Self::events).
    ///
    /// Returns the terminal outcome that was delivered to the sink, or `None`
    /// when the request was cancelled.
    async fn run(
        &self,
        endpoint: &str,
        body: Value,
        sink: &dyn EventSink,
        cancel: CancellationToken,
    ) -> Option<StreamOutcome> {
        let mut events = self.events(endpoint, body, cancel);
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Progress(progress) => sink.on_progress(progress),
                StreamEvent::Result(data) => {
                    sink.on_result(data.clone());
                    return Some(Ok(data));
                }
                StreamEvent::Failed(error) => {
                    sink.on_error(error.clone());
                    return Some(Err(error));
                }
            }
        }
        None
    }

    async fn analyze(
        &self,
        operation: &Operation,
        sink: &dyn EventSink,
        cancel: CancellationToken,
    ) -> Option<StreamOutcome> {
        self.run(operation.stream_endpoint(), operation.body(), sink, cancel)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestStreamClient {
    settings: StreamSettings,
    client: reqwest::Client,
}

impl ReqwestStreamClient {
    pub fn new(settings: StreamSettings) -> Result<Self, StreamError> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }
}

pub(crate) fn build_client(settings: &StreamSettings) -> Result<reqwest::Client, StreamError> {
    let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
    if let Some(timeout) = settings.request_timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| StreamError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl StreamClient for ReqwestStreamClient {
    fn events(&self, endpoint: &str, body: Value, cancel: CancellationToken) -> EventStream {
        let url = match self.settings.endpoint_url(endpoint) {
            Ok(url) => url,
            Err(err) => return stream::once(async move { StreamEvent::Failed(err) }).boxed(),
        };
        client_info!("starting stream request to {}", url);
        let request = self.client.post(url).json(&body);
        let reader = BodyReader {
            state: ReadState::Pending(request),
            marker: self.settings.marker.clone(),
            queue: VecDeque::new(),
            cancel,
        };
        stream::unfold(reader, |mut reader| async move {
            let event = reader.next_event().await?;
            Some((event, reader))
        })
        .boxed()
    }
}

enum ReadState {
    Pending(reqwest::RequestBuilder),
    Streaming {
        body: BoxStream<'static, reqwest::Result<Bytes>>,
        parser: StreamParser,
    },
    Done,
}

struct BodyReader {
    state: ReadState,
    marker: String,
    queue: VecDeque<StreamEvent>,
    cancel: CancellationToken,
}

impl BodyReader {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if self.cancel.is_cancelled() {
                if !matches!(self.state, ReadState::Done) || !self.queue.is_empty() {
                    client_info!("stream request cancelled");
                }
                self.queue.clear();
                self.state = ReadState::Done;
                return None;
            }
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            match std::mem::replace(&mut self.state, ReadState::Done) {
                ReadState::Done => return None,
                ReadState::Pending(request) => {
                    let response = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => continue,
                        response = request.send() => response,
                    };
                    let response = match response {
                        Ok(response) => response,
                        Err(err) => return Some(StreamEvent::Failed(map_reqwest_error(err))),
                    };
                    let status = response.status();
                    if !status.is_success() {
                        client_warn!("stream request failed with status {}", status);
                        return Some(StreamEvent::Failed(StreamError::new(
                            FailureKind::HttpStatus(status.as_u16()),
                            status.to_string(),
                        )));
                    }
                    let content_type = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .map(|value| value.to_string());
                    let parser = StreamParser::new(
                        TextStreamDecoder::for_content_type(content_type.as_deref()),
                        FrameDecoder::new(self.marker.clone()),
                    );
                    self.state = ReadState::Streaming {
                        body: response.bytes_stream().boxed(),
                        parser,
                    };
                }
                ReadState::Streaming {
                    mut body,
                    mut parser,
                } => {
                    let chunk = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => continue,
                        chunk = body.next() => chunk,
                    };
                    match chunk {
                        Some(Ok(bytes)) => {
                            client_debug!("received {} byte chunk", bytes.len());
                            self.queue.extend(parser.feed(&bytes));
                            if !parser.is_done() {
                                self.state = ReadState::Streaming { body, parser };
                            }
                        }
                        Some(Err(err)) => return Some(StreamEvent::Failed(map_reqwest_error(err))),
                        None => self.queue.extend(parser.finish()),
                    }
                }
            }
        }
    }
}

/// Turns raw body chunks into events.
///
/// Owns the text decoder and the line buffer of one response. Once a terminal
/// event has been produced every further input is discarded.
pub struct StreamParser {
    text: TextStreamDecoder,
    frames: FrameDecoder,
    done: bool,
}

impl StreamParser {
    pub fn new(text: TextStreamDecoder, frames: FrameDecoder) -> Self {
        Self {
            text,
            frames,
            done: false,
        }
    }

    /// UTF-8 body using the default `data:` marker.
    pub fn utf8() -> Self {
        Self::new(
            TextStreamDecoder::for_content_type(None),
            FrameDecoder::default(),
        )
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        let text = self.text.decode_chunk(chunk);
        let frames = self.frames.push(&text);
        let mut events = Vec::new();
        self.collect(frames, &mut events);
        events
    }

    /// Flushes the decoder and the unterminated last line at end of body.
    ///
    /// Always leaves the parser done; if no terminal frame was seen a protocol
    /// failure is appended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        let text = self.text.finish();
        let frames = self.frames.push(&text);
        self.collect(frames, &mut events);
        if let Some(tail) = self.frames.finish() {
            self.collect(vec![tail], &mut events);
        }
        if !self.done {
            client_warn!("{}", MISSING_TERMINAL_MESSAGE);
            self.done = true;
            events.push(StreamEvent::Failed(StreamError::new(
                FailureKind::Protocol,
                MISSING_TERMINAL_MESSAGE,
            )));
        }
        events
    }

    fn collect(
        &mut self,
        frames: Vec<Result<crate::Frame, StreamError>>,
        out: &mut Vec<StreamEvent>,
    ) {
        for frame in frames {
            if self.done {
                break;
            }
            let event = match frame {
                Ok(frame) => match frame.into_event() {
                    Some(event) => event,
                    None => continue,
                },
                Err(err) => StreamEvent::Failed(err),
            };
            if event.is_terminal() {
                self.done = true;
            }
            out.push(event);
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return StreamError::new(FailureKind::InvalidUrl, err.to_string());
    }
    StreamError::new(FailureKind::Network, err.to_string())
}

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use festival_client::{
    ErrorCategory, EventSink, FailureKind, Operation, ProgressEvent, ReqwestStreamClient,
    StreamClient, StreamError, StreamEvent, StreamSettings, MISSING_TERMINAL_MESSAGE,
    PARSE_FAILURE_MESSAGE,
};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEYWORD_STREAM: &str = "/api/analyze/keyword/stream";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Progress(ProgressEvent),
    Result(Value),
    Error(StreamError),
}

#[derive(Default)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<Call> {
        self.calls.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for RecordingSink {
    fn on_progress(&self, event: ProgressEvent) {
        self.calls.lock().unwrap().push(Call::Progress(event));
    }

    fn on_result(&self, data: Value) {
        self.calls.lock().unwrap().push(Call::Result(data));
    }

    fn on_error(&self, error: StreamError) {
        self.calls.lock().unwrap().push(Call::Error(error));
    }
}

async fn serve(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(KEYWORD_STREAM))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_raw(body.as_bytes().to_vec(), "text/event-stream; charset=utf-8"),
        )
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> ReqwestStreamClient {
    ReqwestStreamClient::new(StreamSettings::with_base_url(server.uri())).expect("client")
}

async fn run_keyword(server: &MockServer) -> (Option<Result<Value, StreamError>>, Vec<Call>) {
    let client = client_for(server);
    let sink = RecordingSink::default();
    let outcome = client
        .run(
            KEYWORD_STREAM,
            json!({"keyword": "축제", "num_reviews": 10}),
            &sink,
            CancellationToken::new(),
        )
        .await;
    (outcome, sink.take())
}

#[tokio::test]
async fn progress_frames_then_result_in_wire_order() {
    init_logging();
    let body = "data:{\"type\":\"progress\",\"percent\":0.2,\"message\":\"crawling\"}\n\
                data:{\"type\":\"progress\",\"percent\":0.6,\"message\":\"scoring\"}\n\
                data:{\"type\":\"result\",\"data\":{\"total_pos\":5,\"total_neg\":2}}";
    let server = serve(200, body).await;

    let (outcome, calls) = run_keyword(&server).await;

    assert_eq!(
        calls,
        vec![
            Call::Progress(ProgressEvent::new(0.2, "crawling")),
            Call::Progress(ProgressEvent::new(0.6, "scoring")),
            Call::Result(json!({"total_pos": 5, "total_neg": 2})),
        ]
    );
    assert_eq!(outcome, Some(Ok(json!({"total_pos": 5, "total_neg": 2}))));
}

#[tokio::test]
async fn backend_style_frames_with_blank_separators() {
    init_logging();
    let body = "data: {\"type\": \"progress\", \"percent\": 0, \"message\": \"분석 시작...\"}\n\n\
                data: {\"type\": \"progress\", \"percent\": 1, \"message\": \"분석 완료\"}\n\n\
                data: {\"type\": \"result\", \"data\": {\"keyword\": \"강릉커피축제\"}}\n\n";
    let server = serve(200, body).await;

    let (outcome, calls) = run_keyword(&server).await;

    assert_eq!(
        calls,
        vec![
            Call::Progress(ProgressEvent::new(0.0, "분석 시작...")),
            Call::Progress(ProgressEvent::new(1.0, "분석 완료")),
            Call::Result(json!({"keyword": "강릉커피축제"})),
        ]
    );
    assert!(matches!(outcome, Some(Ok(_))));
}

#[tokio::test]
async fn error_frame_terminates_without_result() {
    init_logging();
    let body = "data:{\"type\":\"progress\",\"percent\":0.1,\"message\":\"a\"}\n\
                data:{\"type\":\"progress\",\"percent\":0.3,\"message\":\"b\"}\n\
                data:{\"type\":\"error\",\"message\":\"블로그를 찾을 수 없습니다\"}\n\
                data:{\"type\":\"result\",\"data\":{}}\n";
    let server = serve(200, body).await;

    let (outcome, calls) = run_keyword(&server).await;

    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], Call::Progress(_)));
    assert!(matches!(calls[1], Call::Progress(_)));
    match &calls[2] {
        Call::Error(err) => {
            assert_eq!(err.kind, FailureKind::Application);
            assert_eq!(err.category(), ErrorCategory::Application);
            assert_eq!(err.message, "블로그를 찾을 수 없습니다");
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(matches!(outcome, Some(Err(_))));
}

#[tokio::test]
async fn malformed_frame_reports_protocol_error_and_stops() {
    init_logging();
    let body = "data:{\"type\":\"progress\",\"percent\":0.1,\"message\":\"a\"}\n\
                data:{this is not json\n\
                data:{\"type\":\"result\",\"data\":{}}\n";
    let server = serve(200, body).await;

    let (_outcome, calls) = run_keyword(&server).await;

    assert_eq!(
        calls,
        vec![
            Call::Progress(ProgressEvent::new(0.1, "a")),
            Call::Error(StreamError {
                kind: FailureKind::Protocol,
                message: PARSE_FAILURE_MESSAGE.to_string(),
            }),
        ]
    );
}

#[tokio::test]
async fn non_marker_lines_produce_no_callbacks() {
    init_logging();
    let body = ": keep-alive\n\nevent: progress\nretry: 1000\n   \n\
                data:{\"type\":\"result\",\"data\":null}\n";
    let server = serve(200, body).await;

    let (_outcome, calls) = run_keyword(&server).await;

    assert_eq!(calls, vec![Call::Result(Value::Null)]);
}

#[tokio::test]
async fn http_failure_short_circuits() {
    init_logging();
    let body = "data:{\"type\":\"progress\",\"percent\":0.5,\"message\":\"x\"}\n";
    let server = serve(500, body).await;

    let (outcome, calls) = run_keyword(&server).await;

    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Call::Error(err) => {
            assert_eq!(err.kind, FailureKind::HttpStatus(500));
            assert_eq!(err.category(), ErrorCategory::Transport);
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(matches!(outcome, Some(Err(_))));
}

#[tokio::test]
async fn body_without_terminal_frame_is_a_protocol_error() {
    init_logging();
    let body = "data:{\"type\":\"progress\",\"percent\":0.5,\"message\":\"half\"}\n";
    let server = serve(200, body).await;

    let (_outcome, calls) = run_keyword(&server).await;

    assert_eq!(
        calls,
        vec![
            Call::Progress(ProgressEvent::new(0.5, "half")),
            Call::Error(StreamError {
                kind: FailureKind::Protocol,
                message: MISSING_TERMINAL_MESSAGE.to_string(),
            }),
        ]
    );
}

#[tokio::test]
async fn unknown_frame_types_are_skipped() {
    init_logging();
    let body = "data:{\"type\":\"heartbeat\",\"at\":1}\n\
                data:{\"type\":\"result\",\"data\":1}\n";
    let server = serve(200, body).await;

    let (_outcome, calls) = run_keyword(&server).await;

    assert_eq!(calls, vec![Call::Result(json!(1))]);
}

#[tokio::test]
async fn operation_body_is_posted_as_json() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze/comparison/stream"))
        .and(body_json(json!({
            "keyword_a": "A축제",
            "keyword_b": "B축제",
            "num_reviews": 7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data:{\"type\":\"result\",\"data\":{\"ok\":true}}\n",
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let sink = RecordingSink::default();
    let outcome = client
        .analyze(
            &Operation::comparison("A축제", "B축제", 7),
            &sink,
            CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, Some(Ok(json!({"ok": true}))));
}

#[tokio::test]
async fn cancelled_before_start_delivers_nothing() {
    init_logging();
    let server = serve(200, "data:{\"type\":\"result\",\"data\":1}\n").await;
    let client = client_for(&server);
    let sink = RecordingSink::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = client
        .run(KEYWORD_STREAM, json!({}), &sink, cancel)
        .await;

    assert_eq!(outcome, None);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn cancelling_mid_stream_drops_buffered_frames() {
    init_logging();
    let body = "data:{\"type\":\"progress\",\"percent\":0.1,\"message\":\"a\"}\n\
                data:{\"type\":\"progress\",\"percent\":0.2,\"message\":\"b\"}\n\
                data:{\"type\":\"result\",\"data\":1}\n";
    let server = serve(200, body).await;
    let client = client_for(&server);
    let cancel = CancellationToken::new();

    let mut events = client.events(KEYWORD_STREAM, json!({}), cancel.clone());
    let first = events.next().await;
    assert_eq!(
        first,
        Some(StreamEvent::Progress(ProgressEvent::new(0.1, "a")))
    );
    cancel.cancel();
    assert_eq!(events.next().await, None);
    assert_eq!(events.next().await, None);
}

#[tokio::test]
async fn event_stream_ends_after_terminal_event() {
    init_logging();
    let body = "data:{\"type\":\"result\",\"data\":\"done\"}\n\
                data:{\"type\":\"progress\",\"percent\":1,\"message\":\"late\"}\n";
    let server = serve(200, body).await;
    let client = client_for(&server);

    let events: Vec<StreamEvent> = client
        .events(KEYWORD_STREAM, json!({}), CancellationToken::new())
        .collect()
        .await;

    assert_eq!(events, vec![StreamEvent::Result(json!("done"))]);
}

#[tokio::test]
async fn slow_response_times_out_when_deadline_is_set() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(KEYWORD_STREAM))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("data:{\"type\":\"result\",\"data\":1}\n"),
        )
        .mount(&server)
        .await;

    let settings = StreamSettings {
        request_timeout: Some(Duration::from_millis(50)),
        ..StreamSettings::with_base_url(server.uri())
    };
    let client = ReqwestStreamClient::new(settings).unwrap();
    let sink = RecordingSink::default();

    let outcome = client
        .run(KEYWORD_STREAM, json!({}), &sink, CancellationToken::new())
        .await;

    let err = outcome.unwrap().unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
    assert_eq!(sink.take(), vec![Call::Error(err)]);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    init_logging();
    // Port 9 (discard) on localhost is not served in test environments.
    let client =
        ReqwestStreamClient::new(StreamSettings::with_base_url("http://127.0.0.1:9")).unwrap();
    let sink = RecordingSink::default();

    let outcome = client
        .run(KEYWORD_STREAM, json!({}), &sink, CancellationToken::new())
        .await;

    let err = outcome.unwrap().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transport);
    assert_eq!(sink.take().len(), 1);
}

#[tokio::test]
async fn invalid_base_url_fails_without_network() {
    init_logging();
    let client = ReqwestStreamClient::new(StreamSettings::with_base_url("::not a url::")).unwrap();
    let sink = RecordingSink::default();

    let outcome = client
        .run(KEYWORD_STREAM, json!({}), &sink, CancellationToken::new())
        .await;

    assert_eq!(outcome.unwrap().unwrap_err().kind, FailureKind::InvalidUrl);
}

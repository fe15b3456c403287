use glint::attachments::Attachment;
use glint::chat::ChatMessage;
use glint::gemini::{build_contents, stream_generate, CancelToken, StreamEvent};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash";

fn key() -> String {
    "A".repeat(39)
}

fn endpoint() -> String {
    format!("/v1beta/models/{MODEL}:streamGenerateContent")
}

fn sse_body(fragments: &[&str]) -> String {
    fragments
        .iter()
        .map(|text| {
            format!(
                "data: {}\n\n",
                serde_json::json!({
                    "candidates": [{"content": {"parts": [{"text": text}]}}]
                })
            )
        })
        .collect()
}

async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn streamed_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn fragments_stream_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .and(query_param("alt", "sse"))
        .and(query_param("key", key()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Hel", "lo ", "world"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel(32);
    let contents = build_contents(&[ChatMessage::user("hi".to_string(), Vec::new())]);
    stream_generate(&server.uri(), &key(), MODEL, contents, tx, CancelToken::new())
        .await
        .expect("stream succeeds");

    let events = collect(rx).await;
    assert!(matches!(events.first(), Some(StreamEvent::Start)));
    assert!(matches!(events.last(), Some(StreamEvent::End)));
    assert_eq!(streamed_text(&events), "Hello world");
}

#[tokio::test]
async fn cancelled_token_stops_fragment_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["never", "shown"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let cancel = CancelToken::new();
    cancel.cancel();

    let (tx, rx) = mpsc::channel(32);
    let contents = build_contents(&[ChatMessage::user("hi".to_string(), Vec::new())]);
    stream_generate(&server.uri(), &key(), MODEL, contents, tx, cancel)
        .await
        .expect("cancellation is a clean exit");

    let events = collect(rx).await;
    assert_eq!(streamed_text(&events), "");
    assert!(matches!(events.last(), Some(StreamEvent::End)));
}

#[tokio::test]
async fn invalid_key_error_is_distinguished() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "error": {
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT"
        }
    });
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(ResponseTemplate::new(400).set_body_json(body))
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel(32);
    let contents = build_contents(&[ChatMessage::user("hi".to_string(), Vec::new())]);
    let result =
        stream_generate(&server.uri(), "bad-key", MODEL, contents, tx, CancelToken::new()).await;
    assert!(result.is_err());

    let events = collect(rx).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error {
            message,
            invalid_key,
        } => {
            assert!(*invalid_key);
            assert!(message.contains("API key not valid"));
        }
        other => panic!("expected an error event, got {other:?}"),
    }
}

#[tokio::test]
async fn server_failure_is_a_generic_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel(32);
    let contents = build_contents(&[ChatMessage::user("hi".to_string(), Vec::new())]);
    let result =
        stream_generate(&server.uri(), &key(), MODEL, contents, tx, CancelToken::new()).await;
    assert!(result.is_err());

    let events = collect(rx).await;
    match &events[0] {
        StreamEvent::Error {
            message,
            invalid_key,
        } => {
            assert!(!*invalid_key);
            assert!(message.contains("backend exploded"));
        }
        other => panic!("expected an error event, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_chunks_are_skipped() {
    let server = MockServer::start().await;
    let body = format!("data: this is not json\n\n{}", sse_body(&["still works"]));
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel(32);
    let contents = build_contents(&[ChatMessage::user("hi".to_string(), Vec::new())]);
    stream_generate(&server.uri(), &key(), MODEL, contents, tx, CancelToken::new())
        .await
        .expect("stream succeeds");

    let events = collect(rx).await;
    assert_eq!(streamed_text(&events), "still works");
    assert!(matches!(events.last(), Some(StreamEvent::End)));
}

#[tokio::test]
async fn image_attachments_travel_as_inline_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["ok"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let attachment = Attachment {
        name: "photo.png".to_string(),
        mime_type: "image/png".to_string(),
        data: "aGVsbG8=".to_string(),
        is_image: true,
    };
    let contents = build_contents(&[ChatMessage::user(
        "what is this?".to_string(),
        vec![attachment],
    )]);

    let (tx, rx) = mpsc::channel(32);
    stream_generate(&server.uri(), &key(), MODEL, contents, tx, CancelToken::new())
        .await
        .expect("stream succeeds");
    drop(collect(rx).await);

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body is JSON");
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(
        body["contents"][0]["parts"][0]["inlineData"]["mimeType"],
        "image/png"
    );
    assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "aGVsbG8=");
    assert_eq!(body["contents"][0]["parts"][1]["text"], "what is this?");
}

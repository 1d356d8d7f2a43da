//! OpenAI-compatible provider tests
//!
//! Points the provider at a one-shot HTTP responder on localhost and checks
//! how each kind of reply is classified.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use backrooms::error::Error;
use backrooms::provider::{CompletionProvider, OpenAiConfig, OpenAiProvider};
use backrooms::types::TurnMessage;

/// Raw request captured by the responder
#[derive(Debug, Default, Clone)]
struct Captured {
    head: String,
    body: String,
}

/// Serve exactly one request with `status` and `body`, returning the base URL.
async fn respond_once(status: u16, body: &'static str) -> (String, Arc<Mutex<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Captured::default()));
    let sink = captured.clone();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                return;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        *sink.lock() = Captured {
            head,
            body: String::from_utf8_lossy(&buf[head_end..]).to_string(),
        };

        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    });

    (format!("http://{}/v1", addr), captured)
}

fn provider(base_url: String, api_key: &str) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiConfig {
        base_url,
        api_key: api_key.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn context() -> Vec<TurnMessage> {
    vec![
        TurnMessage::system("You are GPT-4..."),
        TurnMessage::assistant("Earlier reply."),
    ]
}

#[tokio::test]
async fn test_successful_completion() {
    let (url, captured) = respond_once(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}],"usage":{"total_tokens":12}}"#,
    )
    .await;

    let text = provider(url, "sk-test").complete("gpt-4", &context()).await.unwrap();
    assert_eq!(text, "Hi there");

    let request = captured.lock().clone();
    assert!(request.head.starts_with("POST /v1/chat/completions"));
    assert!(request.head.to_lowercase().contains("authorization: bearer sk-test"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Earlier reply.");
}

#[tokio::test]
async fn test_keyless_request_has_no_auth_header() {
    let (url, captured) =
        respond_once(200, r#"{"choices":[{"message":{"content":"ok"}}]}"#).await;

    provider(url, "").complete("llama3", &context()).await.unwrap();
    assert!(!captured.lock().head.to_lowercase().contains("authorization"));
}

#[tokio::test]
async fn test_error_status() {
    let (url, _) = respond_once(429, r#"{"error":{"message":"rate limited"}}"#).await;

    let err = provider(url, "sk-test").complete("gpt-4", &context()).await.unwrap_err();
    match err {
        Error::ProviderStatus { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let (url, _) = respond_once(200, "this is not json").await;

    let err = provider(url, "sk-test").complete("gpt-4", &context()).await.unwrap_err();
    assert!(matches!(err, Error::ProviderMalformed { .. }));
}

#[tokio::test]
async fn test_no_choices() {
    let (url, _) = respond_once(200, r#"{"choices":[]}"#).await;

    let err = provider(url, "sk-test").complete("gpt-4", &context()).await.unwrap_err();
    assert!(matches!(err, Error::ProviderMalformed { .. }));
}

#[tokio::test]
async fn test_null_content() {
    let (url, _) = respond_once(200, r#"{"choices":[{"message":{"content":null}}]}"#).await;

    let err = provider(url, "sk-test").complete("gpt-4", &context()).await.unwrap_err();
    assert!(matches!(err, Error::ProviderEmpty { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Bind then drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let err = provider(format!("http://{}/v1", addr), "sk-test")
        .complete("gpt-4", &context())
        .await
        .unwrap_err();
    assert!(err.is_provider());
    assert!(matches!(err, Error::ProviderRequest { .. }));
}

#[tokio::test]
async fn test_health_check_reports_down_endpoint() {
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let health = provider(format!("http://{}/v1", addr), "")
        .health_check()
        .await
        .unwrap();
    assert!(!health.operational);
    assert!(health.error.is_some());
}

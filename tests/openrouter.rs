//! `OpenRouterBackend` against a local HTTP/1.1 stub.
//!
//! The stub accepts one connection, records the raw request and answers
//! with a canned status and body.

use docmd_translate::pipeline::transform::{ChatBackend, OpenRouterBackend, RemoteTransform};
use docmd_translate::{HttpPageSource, PageError, PageSource, TransformError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ── Stub server ──────────────────────────────────────────────────────────────

struct Stub {
    url: String,
    request: JoinHandle<String>,
}

async fn stub(status: &'static str, content_type: &'static str, body: &'static str) -> Stub {
    stub_with_delay(status, content_type, body, Duration::ZERO).await
}

async fn stub_with_delay(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
    delay: Duration,
) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let request = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let raw = read_request(&mut socket).await;
        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        raw
    });

    Stub {
        url: format!("http://{addr}/api/v1/chat/completions"),
        request,
    }
}

/// Read headers, then exactly `Content-Length` bytes of body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn backend(url: &str, timeout: Duration) -> OpenRouterBackend {
    OpenRouterBackend::new(
        reqwest::Client::new(),
        url,
        "sk-test",
        "openai/gpt-3.5-turbo",
        timeout,
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn success_returns_first_choice_and_sends_expected_request() {
    let s = stub(
        "200 OK",
        "application/json",
        r##"{"choices":[{"message":{"role":"assistant","content":"# こんにちは\n"}}]}"##,
    )
    .await;

    let text = backend(&s.url, Duration::from_secs(5))
        .complete("Translate: # Hello")
        .await
        .unwrap();
    assert_eq!(text, "# こんにちは");

    let raw = s.request.await.unwrap();
    assert!(raw.starts_with("POST /api/v1/chat/completions"));
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["model"], "openai/gpt-3.5-turbo");
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["messages"][0]["content"], "Translate: # Hello");
    assert_eq!(json["n"], 1);
}

#[tokio::test]
async fn server_error_is_upstream_failure_with_status() {
    let s = stub("500 Internal Server Error", "text/plain", "overloaded").await;
    let err = backend(&s.url, Duration::from_secs(5))
        .complete("x")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransformError::UpstreamFailure {
            status: Some(500),
            detail: "overloaded".into()
        }
    );
}

#[tokio::test]
async fn body_without_choices_is_malformed() {
    let s = stub(
        "200 OK",
        "application/json",
        r#"{"error":{"message":"No endpoints found"}}"#,
    )
    .await;
    let err = backend(&s.url, Duration::from_secs(5))
        .complete("x")
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::MalformedResponse { .. }));
}

#[tokio::test]
async fn slow_server_times_out() {
    let s = stub_with_delay(
        "200 OK",
        "application/json",
        r#"{"choices":[{"message":{"content":"late"}}]}"#,
        Duration::from_secs(3),
    )
    .await;
    let err = backend(&s.url, Duration::from_millis(200))
        .complete("x")
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::UpstreamFailure { status: None, .. }));
}

#[tokio::test]
async fn connection_refused_degrades_to_passthrough() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let url = format!("http://{addr}/v1/chat/completions");
    let transform = RemoteTransform::new(
        Some(std::sync::Arc::new(backend(&url, Duration::from_secs(2)))),
        "",
    );

    let out = transform
        .transform("{markdown_content}", "# Keep\ntext", "Markdown Translation (chunk 1 of 1)")
        .await;
    assert!(matches!(
        out.reason(),
        Some(TransformError::UpstreamFailure { status: None, .. })
    ));
    assert!(out.text().ends_with("# Keep\ntext"));
}

#[tokio::test]
async fn http_page_source_extracts_main() {
    let s = stub(
        "200 OK",
        "text/html; charset=utf-8",
        r#"<!doctype html><html><body><nav>x</nav><main id="main"><h1>Docs</h1></main></body></html>"#,
    )
    .await;
    let source = HttpPageSource::new(reqwest::Client::new(), "main", 3000);
    let html = source.fetch_main(&s.url).await.unwrap();
    assert_eq!(html, "<h1>Docs</h1>");
}

#[tokio::test]
async fn http_page_source_reports_missing_element_and_bad_status() {
    let s = stub("200 OK", "text/html", "<html><body><p>no main</p></body></html>").await;
    let source = HttpPageSource::new(reqwest::Client::new(), "main", 3000);
    let err = source.fetch_main(&s.url).await.unwrap_err();
    assert!(matches!(err, PageError::ContentNotFound { .. }));

    let s = stub("404 Not Found", "text/html", "gone").await;
    let err = source.fetch_main(&s.url).await.unwrap_err();
    assert!(matches!(err, PageError::FetchFailed { .. }));
}

#[tokio::test]
async fn http_page_source_times_out() {
    let s = stub_with_delay(
        "200 OK",
        "text/html",
        r#"<div id="main">late</div>"#,
        Duration::from_secs(3),
    )
    .await;
    let source = HttpPageSource::new(reqwest::Client::new(), "main", 200);
    let err = source.fetch_main(&s.url).await.unwrap_err();
    assert_eq!(
        err,
        PageError::NavigationTimeout {
            url: s.url.clone(),
            timeout_ms: 200
        }
    );
}

//! Integration tests for `TelegramNotifier` against a `wiremock` server.

use std::time::Duration;

use feedwatch_core::{DeliveryError, Notifier};
use feedwatch_notify::TelegramNotifier;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:secret";

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::new(&server.uri(), TOKEN, Duration::from_secs(5))
        .expect("failed to build test notifier")
}

fn send_message_path() -> String {
    format!("/bot{TOKEN}/sendMessage")
}

#[tokio::test]
async fn sends_markdown_without_link_preview() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(send_message_path()))
        .and(body_partial_json(json!({
            "chat_id": "-1001",
            "text": "*summary*",
            "parse_mode": "Markdown",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .send(" -1001 ", "*summary*")
        .await
        .expect("send failed");
}

#[tokio::test]
async fn blank_sink_is_invalid() {
    let server = MockServer::start().await;

    let err = notifier(&server).send("  ", "text").await.unwrap_err();

    assert!(matches!(err, DeliveryError::InvalidTarget(_)), "got: {err:?}");
}

#[tokio::test]
async fn api_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(send_message_path()))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was kicked from the channel chat"
        })))
        .mount(&server)
        .await;

    let err = notifier(&server).send("-1001", "text").await.unwrap_err();

    assert!(
        matches!(err, DeliveryError::Rejected { status: 403, ref description } if description.contains("kicked")),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn unparseable_markdown_is_resent_as_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(send_message_path()))
        .and(body_partial_json(json!({ "parse_mode": "Markdown" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities: Can't find end of the entity"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(send_message_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .send("-1001", "task_name with *unbalanced markup")
        .await
        .expect("plain-text resend should succeed");
}

#[tokio::test]
async fn request_errors_do_not_leak_the_token() {
    // Nothing listens on this port.
    let notifier =
        TelegramNotifier::new("http://127.0.0.1:9", TOKEN, Duration::from_secs(2)).unwrap();

    let err = notifier.send("-1001", "text").await.unwrap_err();

    assert!(matches!(err, DeliveryError::Request(_)), "got: {err:?}");
    assert!(!err.to_string().contains("secret"));
}

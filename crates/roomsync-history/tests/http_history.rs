// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History client tests against a wiremock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use roomsync_config::model::HistoryConfig;
use roomsync_core::{ConversationId, Credential, HistoryError, HistorySource, MessageId};
use roomsync_history::HttpHistorySource;

const MESSAGES_PATH: &str = "/api/conversations/room-1/messages";

fn event(id: i64, ts: i64) -> serde_json::Value {
    json!({
        "id": id,
        "conversation_id": "room-1",
        "sender": {"id": "u1", "name": "Alice"},
        "content": format!("m{id}"),
        "timestamp": ts,
    })
}

fn source(server: &MockServer, page_size: u32, max_pages: u32) -> HttpHistorySource {
    let config = HistoryConfig {
        page_size,
        max_pages,
        ..HistoryConfig::default()
    };
    HttpHistorySource::new(format!("{}/api", server.uri()), &config)
        .unwrap()
        .with_retry_delay(Duration::from_millis(10))
}

async fn fetch(source: &HttpHistorySource) -> Result<Vec<roomsync_core::Message>, HistoryError> {
    source
        .fetch_history(&ConversationId::new("room-1"), &Credential::new("tok"))
        .await
}

#[tokio::test]
async fn bare_array_single_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .and(query_param("limit", "50"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event(5, 100)])))
        .expect(1)
        .mount(&server)
        .await;

    let messages = fetch(&source(&server, 50, 20)).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, MessageId::Number(5));
    assert_eq!(messages[0].sender.label(), "Alice");
}

#[tokio::test]
async fn follows_cursor_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [event(3, 30), event(4, 40)],
            "next_cursor": "c1",
        })))
        .with_priority(5)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .and(query_param("before", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [event(1, 10), event(2, 20)],
            "next_cursor": null,
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let messages = fetch(&source(&server, 2, 20)).await.unwrap();
    let ids: Vec<_> = messages.iter().map(|m| m.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            MessageId::Number(3),
            MessageId::Number(4),
            MessageId::Number(1),
            MessageId::Number(2)
        ]
    );
}

#[tokio::test]
async fn stops_at_max_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [event(1, 10)],
            "next_cursor": "again",
        })))
        .with_priority(5)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .and(query_param("before", "again"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [event(2, 20)],
            "next_cursor": "more",
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let messages = fetch(&source(&server, 1, 2)).await.unwrap();
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn empty_history_is_ok_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(fetch(&source(&server, 50, 20)).await.unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_maps_to_distinct_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetch(&source(&server, 50, 20)).await.unwrap_err();
    assert!(matches!(err, HistoryError::Unauthorized { status: 403 }));
}

#[tokio::test]
async fn transient_error_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event(1, 1)])))
        .with_priority(5)
        .mount(&server)
        .await;

    let messages = fetch(&source(&server, 50, 20)).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn persistent_server_error_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&server)
        .await;

    let err = fetch(&source(&server, 50, 20)).await.unwrap_err();
    match err {
        HistoryError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = fetch(&source(&server, 50, 20)).await.unwrap_err();
    assert!(matches!(err, HistoryError::Decode { .. }));
}

mod common;

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recruitchat::error::StoreError;
use recruitchat::session::SessionId;
use recruitchat::store::{Message, MessageId, MessageStore, Role, SupabaseMessageStore};
use recruitchat::supabase::SupabaseClient;

const TABLE_PATH: &str = "/rest/v1/n8n_chat_histories";

fn store(server: &MockServer) -> SupabaseMessageStore {
    SupabaseMessageStore::new(common::supabase_client(&server.uri()), "n8n_chat_histories")
}

#[tokio::test]
async fn test_load_sends_auth_headers_and_orders_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .and(query_param("session_id", "eq.session_1"))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session_id": "session_1", "message": {"type": "human", "content": "find devs"}},
            {"id": 2, "session_id": "session_1", "message": {"type": "ai", "content": "Here they are"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let messages = store(&server)
        .load(&SessionId::new("session_1"))
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, MessageId::Remote(1));
    assert_eq!(messages[0].role, Role::Human);
    assert_eq!(messages[1].content, "Here they are");
    assert_eq!(messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_load_skips_unusable_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session_id": "s", "message": {"type": "human", "content": "hi"}},
            {"id": 2, "session_id": "s", "message": {"type": "tool", "content": "internal"}},
            {"id": 3, "session_id": "s", "message": "not an object"},
            {"id": 4, "session_id": "s", "message": {"type": "assistant", "content": "hello"}}
        ])))
        .mount(&server)
        .await;

    let messages = store(&server).load(&SessionId::new("s")).await.unwrap();
    let ids: Vec<MessageId> = messages.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![MessageId::Remote(1), MessageId::Remote(4)]);
}

#[tokio::test]
async fn test_append_returns_store_assigned_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "session_id": "session_1",
            "message": {"type": "human", "content": "find devs"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 42, "session_id": "session_1", "message": {"type": "human", "content": "find devs"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let local = Message::human("find devs");
    let saved = store(&server)
        .append(&SessionId::new("session_1"), &local)
        .await
        .unwrap();

    assert_eq!(saved.id, MessageId::Remote(42));
    assert_eq!(saved.content, local.content);
    assert_eq!(saved.created_at, local.created_at);
}

#[tokio::test]
async fn test_list_sessions_summarizes_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session_id": "a", "message": {"type": "human", "content": "Java devs"}},
            {"id": 2, "session_id": "b", "message": {"type": "human", "content": "Rust devs"}},
            {"id": 3, "session_id": "a", "message": {"type": "ai", "content": "Found two"}}
        ])))
        .mount(&server)
        .await;

    let sessions = store(&server).list_sessions().await.unwrap();

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, SessionId::new("a"));
    assert_eq!(sessions[0].title, "Java devs");
    assert_eq!(sessions[0].preview, "Found two");
    assert_eq!(sessions[0].message_count, 2);
    assert_eq!(sessions[1].id, SessionId::new("b"));
}

#[tokio::test]
async fn test_delete_session_filters_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("session_id", "eq.gone"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .delete_session(&SessionId::new("gone"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .expect(1)
        .mount(&server)
        .await;

    let result = store(&server).load(&SessionId::new("s")).await;
    assert_eq!(
        result,
        Err(StoreError::Status {
            status: 401,
            body: "JWT expired".to_string()
        })
    );
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = recruitchat::config::SupabaseConfig {
        retry: common::fast_retry(2),
        ..common::supabase_config(&server.uri())
    };
    let store = SupabaseMessageStore::new(
        SupabaseClient::new(&config).unwrap(),
        "n8n_chat_histories",
    );

    let messages = store.load(&SessionId::new("s")).await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_timed_out_append_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([
                    {"id": 7, "session_id": "s", "message": {"type": "human", "content": "hi"}}
                ]))
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = recruitchat::config::SupabaseConfig {
        timeout_seconds: 1,
        retry: common::fast_retry(2),
        ..common::supabase_config(&server.uri())
    };
    let store = SupabaseMessageStore::new(
        SupabaseClient::new(&config).unwrap(),
        "n8n_chat_histories",
    );

    let result = store
        .append(&SessionId::new("s"), &Message::human("hi"))
        .await;
    assert!(matches!(result, Err(StoreError::Request(_))));
}

#[tokio::test]
async fn test_append_retries_unavailable_store() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 8, "session_id": "s", "message": {"type": "human", "content": "hi"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = recruitchat::config::SupabaseConfig {
        retry: common::fast_retry(2),
        ..common::supabase_config(&server.uri())
    };
    let store = SupabaseMessageStore::new(
        SupabaseClient::new(&config).unwrap(),
        "n8n_chat_histories",
    );

    let saved = store
        .append(&SessionId::new("s"), &Message::human("hi"))
        .await
        .unwrap();
    assert_eq!(saved.id, MessageId::Remote(8));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = store(&server).load(&SessionId::new("s")).await;
    assert!(matches!(result, Err(StoreError::Decode(_))));
}

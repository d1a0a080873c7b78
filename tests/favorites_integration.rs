mod common;

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recruitchat::error::{FavoriteError, StoreError};
use recruitchat::extraction::extract_candidates;
use recruitchat::favorites::{AddOutcome, FavoriteState, FavoritesManager, SupabaseFavoriteStore};
use recruitchat::session::SessionId;
use recruitchat::CandidateBlock;

const TABLE_PATH: &str = "/rest/v1/chat_favoritos";

fn candidates() -> Vec<CandidateBlock> {
    extract_candidates(
        "Best matches:\n\n\
         **Name:** Ana Souza\n**Email:** ana@example.com\n**Summary:** Rust, 6 years\n\n\
         **Name:** Bruno Lima\n**Phone:** +55 11 99999-0000\n",
    )
}

fn manager(server: &MockServer, require_job_posting: bool) -> (FavoritesManager, tempfile::TempDir) {
    let (cache, tmp) = common::create_temp_cache();
    let remote = SupabaseFavoriteStore::new(
        common::supabase_client(&server.uri()),
        "chat_favoritos",
        "recruiter-1",
    );
    let manager = FavoritesManager::new(cache, Arc::new(remote), require_job_posting).unwrap();
    (manager, tmp)
}

#[tokio::test]
async fn test_add_favorite_inserts_row_for_recruiter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(body_partial_json(json!({
            "recrutador_id": "recruiter-1",
            "session_id": "session_1",
            "candidate_index": 0,
            "nome": "Ana Souza",
            "email": "ana@example.com",
            "vaga_id": 7
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"recrutador_id": "recruiter-1", "session_id": "session_1", "candidate_index": 0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, true);
    let session = SessionId::new("session_1");
    let blocks = candidates();

    let outcome = manager
        .add_favorite(&session, &blocks[0], Some(7))
        .await
        .unwrap();

    assert_eq!(outcome, AddOutcome::Added);
    assert_eq!(manager.state(&session, 0), FavoriteState::Favorited);
    assert_eq!(manager.list_for_posting(7).len(), 1);
}

#[tokio::test]
async fn test_conflict_status_is_already_favorited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, false);
    let session = SessionId::new("session_1");

    let outcome = manager
        .add_favorite(&session, &candidates()[1], None)
        .await
        .unwrap();

    assert_eq!(outcome, AddOutcome::AlreadyFavorited);
    assert!(manager.is_favorited(&session, 1));
}

#[tokio::test]
async fn test_unique_violation_code_is_already_favorited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, false);
    let outcome = manager
        .add_favorite(&SessionId::new("s"), &candidates()[0], None)
        .await
        .unwrap();

    assert_eq!(outcome, AddOutcome::AlreadyFavorited);
}

#[tokio::test]
async fn test_server_error_rolls_back_favorite() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, false);
    let session = SessionId::new("session_1");

    let result = manager.add_favorite(&session, &candidates()[0], None).await;

    assert_eq!(
        result,
        Err(FavoriteError::Remote(StoreError::Status {
            status: 500,
            body: "boom".to_string()
        }))
    );
    assert_eq!(manager.state(&session, 0), FavoriteState::Unfavorited);
    assert!(manager.list().is_empty());
}

#[tokio::test]
async fn test_parked_favorite_is_saved_with_chosen_posting() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(body_partial_json(json!({"candidate_index": 1, "vaga_id": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, true);
    let session = SessionId::new("session_1");

    let parked = manager
        .add_favorite(&session, &candidates()[1], None)
        .await
        .unwrap();
    assert!(matches!(parked, AddOutcome::AwaitingPosting(_)));
    assert!(!manager.is_favorited(&session, 1));

    let outcome = manager.complete_pending(3).await.unwrap();
    assert_eq!(outcome, AddOutcome::Added);
    assert!(manager.pending_posting().is_none());
    assert_eq!(manager.references_to(3), 1);
}

#[tokio::test]
async fn test_remove_favorite_deletes_by_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("recrutador_id", "eq.recruiter-1"))
        .and(query_param("session_id", "eq.session_1"))
        .and(query_param("candidate_index", "eq.0"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, false);
    let session = SessionId::new("session_1");
    manager
        .add_favorite(&session, &candidates()[0], None)
        .await
        .unwrap();

    manager.remove_favorite(&session, 0).await.unwrap();

    assert!(!manager.is_favorited(&session, 0));
}

#[tokio::test]
async fn test_load_replaces_local_set_with_remote_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("recrutador_id", "eq.recruiter-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "recrutador_id": "recruiter-1",
                "session_id": "other",
                "candidate_index": 2,
                "nome": "Carla Dias",
                "email": null,
                "vaga_id": 9
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, false);
    manager
        .add_favorite(&SessionId::new("local"), &candidates()[0], None)
        .await
        .unwrap();

    let count = manager.load().await.unwrap();

    assert_eq!(count, 1);
    let favorites = manager.list();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].name, "Carla Dias");
    assert_eq!(favorites[0].email, "");
    assert_eq!(favorites[0].job_posting_id, Some(9));
    assert!(!manager.is_favorited(&SessionId::new("local"), 0));
}

#[tokio::test]
async fn test_remove_session_deletes_remote_rows() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("recrutador_id", "eq.recruiter-1"))
        .and(query_param("session_id", "eq.gone"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _tmp) = manager(&server, false);
    manager.remove_session(&SessionId::new("gone")).await.unwrap();
}

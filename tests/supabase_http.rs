use cloud_diary::backend::{
    AuthBackend, AuthSession, EntryStore, FileSessionStore, Identity, SignUpOutcome,
    SupabaseAuth, SupabaseEntryStore,
};
use cloud_diary::diary_entry::{EntryPatch, NewEntry};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";

fn store(server: &MockServer) -> SupabaseEntryStore {
    SupabaseEntryStore::with_rest_url(
        format!("{}/rest/v1", server.uri()),
        ANON_KEY,
        reqwest::Client::new(),
        "user-token",
    )
}

fn row(id: &str, content: &str, created_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "content": content,
        "created_at": created_at,
    })
}

#[tokio::test]
async fn list_filters_by_owner_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/diary_entries"))
        .and(query_param("select", "*"))
        .and(query_param("user_id", "eq.user-1"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row("b", "second", "2024-06-20T12:05:00+00:00"),
            row("a", "first", "2024-06-20T12:00:00+00:00"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let entries = store(&server).list("user-1").await.unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn insert_returns_server_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/diary_entries"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({"user_id": "user-1", "content": "hello"})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([row("new-id", "hello", "2024-06-20T12:00:00+00:00")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let entry = store(&server)
        .insert(&NewEntry {
            user_id: "user-1".to_string(),
            content: "hello".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(entry.id, "new-id");
    assert_eq!(entry.content, "hello");
}

#[tokio::test]
async fn insert_error_message_comes_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/diary_entries"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": "42501",
            "message": "new row violates row-level security policy for table \"diary_entries\""
        })))
        .mount(&server)
        .await;

    let error = store(&server)
        .insert(&NewEntry {
            user_id: "someone-else".to_string(),
            content: "hello".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "new row violates row-level security policy for table \"diary_entries\" (403)"
    );
}

#[tokio::test]
async fn update_and_delete_target_one_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/diary_entries"))
        .and(query_param("id", "eq.entry-7"))
        .and(body_json(json!({"content": "edited"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/diary_entries"))
        .and(query_param("id", "eq.entry-7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    store
        .update(
            "entry-7",
            &EntryPatch {
                content: "edited".to_string(),
            },
        )
        .await
        .unwrap();
    store.delete("entry-7").await.unwrap();
}

fn auth_client(server: &MockServer, dir: &tempfile::TempDir) -> (SupabaseAuth, FileSessionStore) {
    let session_store = FileSessionStore::new(dir.path().join("session.json"));
    let auth = SupabaseAuth::with_store(
        format!("{}/auth/v1", server.uri()),
        ANON_KEY,
        reqwest::Client::new(),
        session_store.clone(),
    );
    (auth, session_store)
}

#[tokio::test]
async fn sign_in_persists_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({"email": "me@example.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "user": {"id": "user-1", "email": "me@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (auth, session_store) = auth_client(&server, &dir);
    let session = auth.sign_in(" me@example.com ", "secret").await.unwrap();
    assert_eq!(session.user.id, "user-1");

    let restored = auth.restore_session().await.unwrap();
    assert_eq!(restored.as_ref(), Some(&session));
    assert_eq!(session_store.load_session().unwrap(), Some(session));
}

#[tokio::test]
async fn bad_credentials_surface_gotrue_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (auth, session_store) = auth_client(&server, &dir);
    let error = auth.sign_in("me@example.com", "nope").await.unwrap_err();
    assert_eq!(error.to_string(), "Invalid login credentials (400)");
    assert_eq!(session_store.load_session().unwrap(), None);
}

#[tokio::test]
async fn sign_up_may_need_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-2",
            "user": {"id": "user-2", "email": "new@example.com"}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (auth, _) = auth_client(&server, &dir);
    let outcome = auth.sign_up("new@example.com", "secret").await.unwrap();
    assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
}

fn expired_session() -> AuthSession {
    AuthSession {
        access_token: "old-access".to_string(),
        refresh_token: "old-refresh".to_string(),
        expires_at: 0,
        user: Identity {
            id: "user-1".to_string(),
            email: Some("me@example.com".to_string()),
        },
    }
}

#[tokio::test]
async fn expired_session_is_refreshed_on_restore() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({"refresh_token": "old-refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 3600,
            "user": {"id": "user-1", "email": "me@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (auth, session_store) = auth_client(&server, &dir);
    session_store.save_session(&expired_session()).unwrap();

    let restored = auth.restore_session().await.unwrap().unwrap();
    assert_eq!(restored.access_token, "new-access");
    assert_eq!(
        session_store.load_session().unwrap().unwrap().access_token,
        "new-access"
    );
}

#[tokio::test]
async fn failed_refresh_forgets_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "msg": "Invalid Refresh Token: Already Used"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (auth, session_store) = auth_client(&server, &dir);
    session_store.save_session(&expired_session()).unwrap();

    assert_eq!(auth.restore_session().await.unwrap(), None);
    assert_eq!(session_store.load_session().unwrap(), None);
}

#[tokio::test]
async fn sign_out_clears_local_session_even_when_token_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (auth, session_store) = auth_client(&server, &dir);
    let session = expired_session();
    session_store.save_session(&session).unwrap();

    auth.sign_out(&session).await.unwrap();
    assert_eq!(session_store.load_session().unwrap(), None);
}

#![allow(clippy::unwrap_used)]
// Integration tests for `BackendClient` using wiremock.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nurture_api::backend::{AppUserRecord, Order, Select, SubscriptionStatusRecord};
use nurture_api::{BackendClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BackendClient) {
    let server = MockServer::start().await;
    let client = BackendClient::with_client(
        reqwest::Client::new(),
        &server.uri(),
        &SecretString::from("anon-key".to_string()),
    )
    .unwrap();
    (server, client)
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn session_body() -> serde_json::Value {
    json!({
        "access_token": "user-jwt",
        "refresh_token": "refresh",
        "expires_in": 3600,
        "user": {
            "id": "u-1",
            "email": "parent@example.com",
            "user_metadata": { "full_name": "Asha" },
            "created_at": "2026-01-02T03:04:05Z"
        }
    })
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_success_installs_session_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_partial_json(json!({"email": "parent@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
        .mount(&server)
        .await;

    let session = client
        .sign_in_with_password("  Parent@Example.com ", &secret("pw"))
        .await
        .unwrap();

    assert_eq!(session.user.id, "u-1");
    assert_eq!(session.user.metadata_full_name(), Some("Asha"));
    assert!(client.has_session());
}

#[tokio::test]
async fn test_sign_in_invalid_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let result = client.sign_in_with_password("a@b.c", &secret("nope")).await;
    assert!(
        matches!(result, Err(Error::InvalidCredentials)),
        "expected InvalidCredentials, got: {result:?}"
    );
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_sign_in_other_failure_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "email_not_confirmed",
            "msg": "Email not confirmed"
        })))
        .mount(&server)
        .await;

    let result = client.sign_in_with_password("a@b.c", &secret("pw")).await;
    match result {
        Err(Error::Authentication { message }) => assert!(message.contains("Email not confirmed")),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_session_returns_new_tokens() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_partial_json(json!({"refresh_token": "refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
        .expect(1)
        .mount(&server)
        .await;

    let session = client.refresh_session(&secret("refresh")).await.unwrap();
    assert_eq!(session.user.id, "u-1");
    assert_eq!(session.access_token.expose_secret(), "user-jwt");
    assert!(session.refresh_token.is_some());
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_rejected_refresh_token_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .mount(&server)
        .await;

    let result = client.refresh_session(&secret("used")).await;
    assert!(matches!(result, Err(Error::SessionExpired)));
}

#[tokio::test]
async fn test_sign_up_keeps_caller_session() {
    let (server, client) = setup().await;
    client.set_session_token(Some(secret("admin-jwt")));

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(header("Authorization", "Bearer anon-key"))
        .and(body_partial_json(json!({"email": "new@example.com", "data": {"full_name": "new"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-new",
            "email": "new@example.com",
            "user_metadata": {"full_name": "new"}
        })))
        .mount(&server)
        .await;

    let user = client
        .sign_up("New@Example.com", &secret("pw-123456"), Some("new"))
        .await
        .unwrap();
    assert_eq!(user.id, "u-new");
    // Still the admin's token.
    assert!(client.has_session());
}

#[tokio::test]
async fn test_sign_out_uses_session_bearer_and_clears_token() {
    let (server, client) = setup().await;
    client.set_session_token(Some(secret("user-jwt")));

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("Authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.sign_out().await.unwrap();
    assert!(!client.has_session());

    // Second call has no token and never reaches the server.
    client.sign_out().await.unwrap();
}

#[tokio::test]
async fn test_password_reset_request_sends_redirect() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(query_param(
            "redirect_to",
            "https://app.example.com/reset-password",
        ))
        .and(body_partial_json(json!({"email": "a@b.c"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let target = url::Url::parse("https://app.example.com/reset-password").unwrap();
    client
        .request_password_reset("a@b.c", Some(&target))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_password_with_expired_token() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer recovery"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "expired"})))
        .mount(&server)
        .await;

    let result = client
        .update_password(&secret("recovery"), &secret("new-password"))
        .await;
    assert!(matches!(result, Err(Error::SessionExpired)));
}

// ── REST ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_select_eq_returns_first_row() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/app_users"))
        .and(query_param("select", "*"))
        .and(query_param("email", "eq.a@b.c"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "auth_user_id": "u-1",
            "email": "a@b.c",
            "name": "Asha",
            "role": "admin"
        }])))
        .mount(&server)
        .await;

    let row: Option<AppUserRecord> = Select::new("app_users")
        .eq("email", "a@b.c")
        .fetch_one(&client)
        .await
        .unwrap();

    let row = row.unwrap();
    assert_eq!(row.role.as_deref(), Some("admin"));
    assert_eq!(row.name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn test_select_no_rows_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let row: Option<AppUserRecord> = Select::new("user_profiles")
        .eq("auth_user_id", "missing")
        .fetch_one(&client)
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_select_order_param() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/planner_runs"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("user_id", "eq.u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows: Vec<serde_json::Value> = Select::new("planner_runs")
        .eq("user_id", "u-1")
        .order("created_at", Order::Descending)
        .fetch(&client)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_expired_jwt_maps_to_session_expired() {
    let (server, client) = setup().await;
    client.set_session_token(Some(secret("stale")));

    Mock::given(method("GET"))
        .and(path("/rest/v1/app_users"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let result: Result<Vec<AppUserRecord>, _> =
        Select::new("app_users").fetch(&client).await;
    let err = result.unwrap_err();
    assert!(matches!(err, Error::SessionExpired), "got: {err:?}");
}

#[tokio::test]
async fn test_insert_returns_representation() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/emotion_logs"))
        .and(header("Prefer", "return=representation"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([{"id": 9, "user_id": "u-1", "mood": "tired", "result": "ok"}])),
        )
        .mount(&server)
        .await;

    let row: Option<serde_json::Value> = client
        .insert(
            "emotion_logs",
            &json!({"user_id": "u-1", "mood": "tired", "result": "ok"}),
        )
        .await
        .unwrap();
    assert_eq!(row.unwrap()["id"], 9);
}

#[tokio::test]
async fn test_update_eq_patches_filtered_rows() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/app_users"))
        .and(query_param("auth_user_id", "eq.u-1"))
        .and(body_partial_json(json!({"role": "admin"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_eq("app_users", "auth_user_id", "u-1", &json!({"role": "admin"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_backend_error_carries_code() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/app_users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let result: Result<Option<AppUserRecord>, _> =
        client.insert("app_users", &json!({"email": "a@b.c"})).await;
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        Error::Backend { status: 409, code: Some(ref code), .. } if code == "23505"
    ));
}

#[tokio::test]
async fn test_rpc_subscription_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_user_subscription_status"))
        .and(body_partial_json(json!({"user_email": "a@b.c"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "subscription_remaining_days": 0,
            "is_active": false,
            "status": "expired",
            "renewal_needed": true
        }])))
        .mount(&server)
        .await;

    let rows: Vec<SubscriptionStatusRecord> = client
        .rpc("get_user_subscription_status", &json!({"user_email": "a@b.c"}))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].is_active, Some(false));
    assert_eq!(rows[0].renewal_needed, Some(true));
}

#[tokio::test]
async fn test_rate_limited() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_renewal_url"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let result: Result<String, _> = client.rpc("get_renewal_url", &json!({})).await;
    let err = result.unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after_secs: 12 }));
}

#[tokio::test]
async fn test_slow_backend_reports_timeout() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        timeout: Duration::from_secs(1),
        ..TransportConfig::default()
    };
    let client =
        BackendClient::new(&server.uri(), &secret("anon-key"), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/app_users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result: Result<Vec<AppUserRecord>, _> =
        Select::new("app_users").fetch(&client).await;
    assert!(matches!(result, Err(Error::Timeout { timeout_secs: 1 })));
}

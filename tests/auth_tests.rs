mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{PASSWORD, TEST_JWT_SECRET, send, spawn_app};
use mexicapp::db::TokenPurpose;
use mexicapp::services::one_time_token;
use mexicapp::services::token_issuer::{Claims, TokenIssuer, TokenType};
use serde_json::json;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_ping() {
    let app = spawn_app().await;
    let response = app.get("/api/v1/auth/ping", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ok"], true);
    assert_eq!(response.body["service"], "accounts");
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let app = spawn_app().await;

    let response = app.get("/api/v1/auth/ping", None).await;
    assert!(response.headers.contains_key("x-request-id"));

    let request = axum::http::Request::builder()
        .uri("/api/v1/auth/ping")
        .header("X-Request-ID", "trace-abc-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-abc-123");
}

#[tokio::test]
async fn test_register_creates_inactive_user_and_sends_mail() {
    let app = spawn_app().await;

    let response = app.register("ana").await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["email_sent"], true);
    assert_eq!(response.body["data"]["user"]["is_email_verified"], false);
    assert!(response.body["data"]["user"].get("password_hash").is_none());

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].link.contains("/verify-email?token="));
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let app = spawn_app().await;
    assert_eq!(app.register("ana").await.status, StatusCode::CREATED);

    let response = app.register("ana").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    let response = app
        .post(
            "/api/v1/auth/register",
            json!({ "username": "luis", "email": "ANA@example.com", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/v1/auth/register",
            json!({ "username": "luis", "email": "luis@example.com", "password": "12345678" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_duplicate_registration_is_a_validation_error() {
    let app = spawn_app().await;

    let mut registrations = JoinSet::new();
    for n in 0..2 {
        let router = app.router.clone();
        registrations.spawn(async move {
            send(
                router,
                "POST",
                "/api/v1/auth/register",
                Some(json!({
                    "username": "carla",
                    "email": format!("carla{n}@example.com"),
                    "password": PASSWORD,
                })),
                None,
            )
            .await
        });
    }

    let mut statuses = Vec::new();
    while let Some(response) = registrations.join_next().await {
        let response = response.unwrap();
        if response.status == StatusCode::BAD_REQUEST {
            assert_eq!(response.body["code"], "VALIDATION_ERROR");
        }
        statuses.push(response.status);
    }
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);
}

#[tokio::test]
async fn test_login_before_verification_is_forbidden() {
    let app = spawn_app().await;
    app.register("ana").await;

    let response = app.login("ana", PASSWORD).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["details"]["email"], "ana@example.com");

    assert_eq!(app.verify("ana").await.status, StatusCode::OK);
    let response = app.login("ana", PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["is_email_verified"], true);
    assert!(response.body["data"]["user"]["last_login"].is_string());
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let app = spawn_app().await;
    app.register("ana").await;

    assert_eq!(app.verify("ana").await.status, StatusCode::OK);

    let response = app.verify("ana").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Token expired or already used");

    let response = app
        .post(
            "/api/v1/auth/verify-email",
            json!({ "token": "deadbeef" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid token");
}

#[tokio::test]
async fn test_resend_verification_invalidates_previous_token() {
    let app = spawn_app().await;
    app.register("ana").await;
    let first = app.mailer.last_token_for("ana@example.com").unwrap();

    let response = app
        .post(
            "/api/v1/auth/resend-verification",
            json!({ "email": "ana@example.com" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let stale = app
        .post("/api/v1/auth/verify-email", json!({ "token": first }), None)
        .await;
    assert_eq!(stale.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.verify("ana").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_resend_verification_does_not_enumerate() {
    let app = spawn_app().await;
    app.register("ana").await;

    let known = app
        .post(
            "/api/v1/auth/resend-verification",
            json!({ "email": "ana@example.com" }),
            None,
        )
        .await;
    let unknown = app
        .post(
            "/api/v1/auth/resend-verification",
            json!({ "email": "nobody@example.com" }),
            None,
        )
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);
}

#[tokio::test]
async fn test_invalid_credentials() {
    let app = spawn_app().await;
    app.signed_in_user("ana").await;

    let response = app.login("ana", "wrong-password").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid credentials");

    let response = app.login("nobody", "wrong-password").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid credentials");

    let response = app
        .post(
            "/api/v1/auth/login",
            json!({ "username": "", "password": "" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lockout_after_five_failures() {
    let app = spawn_app().await;
    app.signed_in_user("ana").await;

    for _ in 0..5 {
        let response = app.login("ana", "wrong-password").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let response = app.login("ANA", PASSWORD).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["code"], "RATE_LIMITED");

    let locked_until = response.body["details"]["locked_until"].as_str().unwrap();
    let locked_until = chrono::DateTime::parse_from_rfc3339(locked_until).unwrap();
    let remaining = locked_until.with_timezone(&Utc) - Utc::now();
    assert!(remaining > Duration::minutes(14) && remaining <= Duration::minutes(15));
}

#[tokio::test]
async fn test_concurrent_failures_are_all_counted() {
    let app = spawn_app().await;
    app.signed_in_user("bob").await;

    let mut attempts = JoinSet::new();
    for _ in 0..10 {
        let router = app.router.clone();
        attempts.spawn(async move {
            send(
                router,
                "POST",
                "/api/v1/auth/login",
                Some(json!({ "username": "bob", "password": "wrong-password" })),
                None,
            )
            .await
            .status
        });
    }
    while let Some(status) = attempts.join_next().await {
        let status = status.unwrap();
        assert!(
            status == StatusCode::UNAUTHORIZED || status == StatusCode::TOO_MANY_REQUESTS,
            "unexpected status {status}"
        );
    }

    let record = app
        .state
        .store()
        .get_login_attempt("bob")
        .await
        .unwrap()
        .unwrap();
    assert!(record.attempts >= 5, "attempts = {}", record.attempts);
    assert!(record.locked_until.is_some());

    let response = app.login("bob", PASSWORD).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_successful_login_resets_failures() {
    let app = spawn_app().await;
    app.signed_in_user("ana").await;

    for _ in 0..4 {
        app.login("ana", "wrong-password").await;
    }
    assert_eq!(app.login("ana", PASSWORD).await.status, StatusCode::OK);

    for _ in 0..4 {
        app.login("ana", "wrong-password").await;
    }
    assert_eq!(app.login("ana", PASSWORD).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rotates_and_invalidates_old_token() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    let response = app
        .post(
            "/api/v1/auth/refresh",
            json!({ "refresh": tokens.refresh }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let new_refresh = response.body["data"]["refresh"].as_str().unwrap().to_string();
    let new_access = response.body["data"]["access"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, tokens.refresh);

    let replay = app
        .post(
            "/api/v1/auth/refresh",
            json!({ "refresh": tokens.refresh }),
            None,
        )
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

    let me = app.get("/api/v1/auth/me", Some(&new_access)).await;
    assert_eq!(me.status, StatusCode::OK);

    let again = app
        .post("/api/v1/auth/refresh", json!({ "refresh": new_refresh }), None)
        .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    let response = app
        .post(
            "/api/v1/auth/refresh",
            json!({ "refresh": tokens.access }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    let response = app.get("/api/v1/auth/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "UNAUTHORIZED");

    let response = app.get("/api/v1/auth/me", Some("not-a-jwt")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/api/v1/auth/me", Some(&tokens.refresh)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/api/v1/auth/me", Some(&tokens.access)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["username"], "ana");
}

#[tokio::test]
async fn test_access_token_without_live_session_is_rejected() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;
    let user = app
        .state
        .store()
        .get_user_by_username("ana")
        .await
        .unwrap()
        .unwrap();

    let issuer = TokenIssuer::new(
        TEST_JWT_SECRET.as_bytes(),
        Duration::minutes(5),
        Duration::hours(1),
    );
    let now = Utc::now();
    let mut claims = Claims {
        sub: user.id.to_string(),
        jti: "hand-made".to_string(),
        token_type: TokenType::Access,
        sid: None,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(5)).timestamp(),
    };

    let sessionless = issuer.encode(&claims).unwrap();
    let response = app.get("/api/v1/auth/me", Some(&sessionless)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    claims.sid = Some("no-such-session".to_string());
    let unknown_session = issuer.encode(&claims).unwrap();
    let response = app.get("/api/v1/auth/me", Some(&unknown_session)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/api/v1/auth/me", Some(&tokens.access)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_trims_names() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    let response = app
        .request(
            "PATCH",
            "/api/v1/auth/me",
            Some(json!({ "first_name": "  Ana ", "last_name": " López ", "email": "x@y.z" })),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["first_name"], "Ana");
    assert_eq!(response.body["data"]["last_name"], "López");
    assert_eq!(response.body["data"]["email"], "ana@example.com");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    let response = app
        .post(
            "/api/v1/auth/logout",
            json!({ "refresh": tokens.refresh }),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post("/api/v1/auth/refresh", json!({ "refresh": tokens.refresh }), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .post("/api/v1/auth/logout", json!({}), Some(&tokens.access))
        .await;
    assert_ne!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_rejects_garbage_token() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    let response = app
        .post(
            "/api/v1/auth/logout",
            json!({ "refresh": "garbage" }),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/v1/auth/logout", json!({ "refresh": "" }), Some(&tokens.access))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let app = spawn_app().await;
    let first = app.signed_in_user("ana").await;
    let second = app.login("ana", PASSWORD).await;
    let second_refresh = second.body["data"]["refresh"].as_str().unwrap().to_string();

    let response = app
        .post("/api/v1/auth/logout-all", json!({}), Some(&first.access))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["revoked"], 2);

    for refresh in [&first.refresh, &second_refresh] {
        let response = app
            .post("/api/v1/auth/refresh", json!({ "refresh": refresh }), None)
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let response = app.get("/api/v1/auth/me", Some(&first.access)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sessions_list_marks_current() {
    let app = spawn_app().await;
    let first = app.signed_in_user("ana").await;
    app.login("ana", PASSWORD).await;

    let response = app.get("/api/v1/auth/sessions", Some(&first.access)).await;
    assert_eq!(response.status, StatusCode::OK);

    let sessions = response.body["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    let current: Vec<_> = sessions
        .iter()
        .filter(|s| s["is_current"] == true)
        .collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0]["device_name"], "Test phone");
}

#[tokio::test]
async fn test_revoke_session() {
    let app = spawn_app().await;
    let first = app.signed_in_user("ana").await;
    let second = app.login("ana", PASSWORD).await;
    let second_refresh = second.body["data"]["refresh"].as_str().unwrap().to_string();

    let sessions = app.get("/api/v1/auth/sessions", Some(&first.access)).await;
    let other_jti = sessions.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["is_current"] == false)
        .unwrap()["jti"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/v1/auth/sessions/{other_jti}");
    let response = app.request("DELETE", &uri, None, Some(&first.access)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post("/api/v1/auth/refresh", json!({ "refresh": second_refresh }), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.request("DELETE", &uri, None, Some(&first.access)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_reset_request_does_not_enumerate() {
    let app = spawn_app().await;
    app.signed_in_user("ana").await;
    let mails_before = app.mailer.sent().len();

    let known = app
        .post(
            "/api/v1/auth/password-reset/request",
            json!({ "email": "ana@example.com" }),
            None,
        )
        .await;
    let unknown = app
        .post(
            "/api/v1/auth/password-reset/request",
            json!({ "email": "ghost@example.com" }),
            None,
        )
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);
    assert_eq!(app.mailer.sent().len(), mails_before + 1);
}

#[tokio::test]
async fn test_password_reset_confirm_revokes_sessions() {
    let app = spawn_app().await;
    let tokens = app.signed_in_user("ana").await;

    app.post(
        "/api/v1/auth/password-reset/request",
        json!({ "email": "ana@example.com" }),
        None,
    )
    .await;
    let token = app.mailer.last_token_for("ana@example.com").unwrap();

    let response = app
        .post(
            "/api/v1/auth/password-reset/confirm",
            json!({ "token": token, "new_password": "n3w-secret-pass" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post("/api/v1/auth/refresh", json!({ "refresh": tokens.refresh }), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.login("ana", PASSWORD).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("ana", "n3w-secret-pass").await.status, StatusCode::OK);

    let reuse = app
        .post(
            "/api/v1/auth/password-reset/confirm",
            json!({ "token": token, "new_password": "an0ther-pass" }),
            None,
        )
        .await;
    assert_eq!(reuse.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let app = spawn_app().await;
    app.signed_in_user("ana").await;
    let user = app
        .state
        .store()
        .get_user_by_username("ana")
        .await
        .unwrap()
        .unwrap();

    let token = one_time_token::generate();
    app.state
        .store()
        .issue_one_time_token(
            TokenPurpose::PasswordReset,
            user.id,
            &token.hash,
            Utc::now() - Duration::minutes(1),
            None,
        )
        .await
        .unwrap();

    let response = app
        .post(
            "/api/v1/auth/password-reset/confirm",
            json!({ "token": token.raw, "new_password": "n3w-secret-pass" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Token expired or already used");
}

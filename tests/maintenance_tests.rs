mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::spawn_app;
use mexicapp::cli::seed_store;
use mexicapp::db::TokenPurpose;
use mexicapp::scheduler;
use mexicapp::services::one_time_token;

#[tokio::test]
async fn test_purge_removes_only_long_expired_rows() {
    let app = spawn_app().await;
    app.signed_in_user("ana").await;
    let store = app.state.store();
    let user = store.get_user_by_username("ana").await.unwrap().unwrap();

    let long_ago = Utc::now() - Duration::days(30);
    store.blacklist_token("old-jti", user.id, long_ago).await.unwrap();
    store
        .blacklist_token("fresh-jti", user.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let token = one_time_token::generate();
    store
        .issue_one_time_token(TokenPurpose::PasswordReset, user.id, &token.hash, long_ago, None)
        .await
        .unwrap();

    let report = scheduler::purge_expired(store, 7).await.unwrap();
    assert_eq!(report.blacklisted_tokens, 1);
    assert_eq!(report.one_time_tokens, 1);

    assert!(!store.is_token_blacklisted("old-jti").await.unwrap());
    assert!(store.is_token_blacklisted("fresh-jti").await.unwrap());
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let app = spawn_app().await;
    let store = app.state.store();
    let source = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/data/seed.toml"))
        .unwrap();

    let first = seed_store(store, &source).await.unwrap();
    assert_eq!(first.moods, 4);
    assert!(first.venues_created > 0);
    assert_eq!(first.venues_skipped, 0);

    let second = seed_store(store, &source).await.unwrap();
    assert_eq!(second.venues_created, 0);
    assert_eq!(second.venues_skipped, first.venues_created);

    let response = app.get("/api/v1/locations?mood=cultural", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body["data"].as_array().unwrap().is_empty());

    let response = app.get("/api/v1/moods", None).await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_metrics_disabled_returns_not_found() {
    let app = spawn_app().await;
    let response = app.get("/metrics", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

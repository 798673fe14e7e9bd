mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{read_response, send, spawn_app};
use mexicapp::entities::locations::LocationStatus;
use serde_json::json;
use tokio::task::JoinSet;
use tower::ServiceExt;

fn checkout_body() -> serde_json::Value {
    json!({
        "service_score": 5,
        "quality_score": 4,
        "price_score": 3,
        "vibe_score": 5,
        "comment": "Great tacos",
    })
}

#[tokio::test]
async fn test_moods_listing() {
    let app = spawn_app().await;
    let id = app.add_mood("chill").await;
    app.add_mood("cultural").await;

    let response = app.get("/api/v1/moods", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 2);

    let response = app.get(&format!("/api/v1/moods/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["slug"], "chill");

    let response = app.get("/api/v1/moods/9999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_locations_list_only_approved_and_filters_by_mood() {
    let app = spawn_app().await;
    app.add_mood("chill").await;
    app.add_mood("cultural").await;
    app.add_location("QR-1", LocationStatus::Approved, &["chill"]).await;
    app.add_location("QR-2", LocationStatus::Approved, &["cultural"]).await;
    app.add_location("QR-3", LocationStatus::Pending, &["chill"]).await;

    let response = app.get("/api/v1/locations", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let all = response.body["data"].as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["name"], "Venue QR-2");

    let response = app.get("/api/v1/locations?mood=chill", None).await;
    let chill = response.body["data"].as_array().unwrap();
    assert_eq!(chill.len(), 1);
    assert_eq!(chill[0]["moods"], json!(["chill"]));
}

#[tokio::test]
async fn test_location_detail_vibe_match_depends_on_caller() {
    let app = spawn_app().await;
    app.add_mood("chill").await;
    let location = app.add_location("QR-1", LocationStatus::Approved, &["chill"]).await;
    let pending = app.add_location("QR-2", LocationStatus::Pending, &[]).await;
    let tokens = app.signed_in_user("ana").await;

    let uri = format!("/api/v1/locations/{}", location.id);

    let anonymous = app.get(&uri, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert!(anonymous.body["data"]["vibe_match"].is_null());
    assert_eq!(anonymous.body["data"]["moods"][0]["slug"], "chill");

    let signed_in = app.get(&uri, Some(&tokens.access)).await;
    assert_eq!(signed_in.body["data"]["vibe_match"], 70);

    let bad_token = app.get(&uri, Some("not-a-jwt")).await;
    assert_eq!(bad_token.status, StatusCode::OK);
    assert!(bad_token.body["data"]["vibe_match"].is_null());

    let hidden = app
        .get(&format!("/api/v1/locations/{}", pending.id), None)
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_double_checkin_awards_one_collectible() {
    let app = spawn_app().await;
    let location = app.add_location("QR-TACOS", LocationStatus::Approved, &[]).await;
    let tokens = app.signed_in_user("ana").await;

    let first = app
        .post(
            "/api/v1/visits/checkin",
            json!({ "qr_code": "QR-TACOS" }),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["collectible_awarded"], true);

    let second = app
        .post(
            "/api/v1/visits/checkin",
            json!({ "qr_code": " QR-TACOS " }),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(second.body["data"]["collectible_awarded"], false);
    assert_ne!(first.body["data"]["visit_id"], second.body["data"]["visit_id"]);

    let user = app
        .state
        .store()
        .get_user_by_username("ana")
        .await
        .unwrap()
        .unwrap();
    let count = app
        .state
        .store()
        .count_collectibles(user.id, location.id)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let visits = app.get("/api/v1/visits/me", Some(&tokens.access)).await;
    assert_eq!(visits.body["data"].as_array().unwrap().len(), 2);

    let collectibles = app.get("/api/v1/me/collectibles", Some(&tokens.access)).await;
    let collectibles = collectibles.body["data"].as_array().unwrap();
    assert_eq!(collectibles.len(), 1);
    assert_eq!(collectibles[0]["location"]["id"], location.id);
}

#[tokio::test]
async fn test_concurrent_checkins_award_one_collectible() {
    let app = spawn_app().await;
    let location = app.add_location("QR-RACE", LocationStatus::Approved, &[]).await;
    let tokens = app.signed_in_user("ana").await;

    let mut checkins = JoinSet::new();
    for _ in 0..2 {
        let router = app.router.clone();
        let access = tokens.access.clone();
        checkins.spawn(async move {
            send(
                router,
                "POST",
                "/api/v1/visits/checkin",
                Some(json!({ "qr_code": "QR-RACE" })),
                Some(&access),
            )
            .await
        });
    }

    let mut awarded = 0;
    while let Some(response) = checkins.join_next().await {
        let response = response.unwrap();
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        if response.body["data"]["collectible_awarded"] == true {
            awarded += 1;
        }
    }
    assert_eq!(awarded, 1);

    let user = app
        .state
        .store()
        .get_user_by_username("ana")
        .await
        .unwrap()
        .unwrap();
    let count = app
        .state
        .store()
        .count_collectibles(user.id, location.id)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_checkin_rejects_unknown_blank_and_unapproved_codes() {
    let app = spawn_app().await;
    app.add_location("QR-PENDING", LocationStatus::Pending, &[]).await;
    let tokens = app.signed_in_user("ana").await;

    let blank = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "  " }), Some(&tokens.access))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "NOPE" }), Some(&tokens.access))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let pending = app
        .post(
            "/api/v1/visits/checkin",
            json!({ "qr_code": "QR-PENDING" }),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(pending.status, StatusCode::NOT_FOUND);

    let anonymous = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "QR-PENDING" }), None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_rules() {
    let app = spawn_app().await;
    app.add_location("QR-1", LocationStatus::Approved, &[]).await;
    let ana = app.signed_in_user("ana").await;
    let luis = app.signed_in_user("luis").await;

    let checkin = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "QR-1" }), Some(&ana.access))
        .await;
    let visit_id = checkin.body["data"]["visit_id"].as_i64().unwrap();
    let uri = format!("/api/v1/visits/{visit_id}/checkout");

    let missing = app
        .post("/api/v1/visits/9999/checkout", checkout_body(), Some(&ana.access))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let foreign = app.post(&uri, checkout_body(), Some(&luis.access)).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let mut bad_score = checkout_body();
    bad_score["vibe_score"] = json!(6);
    let invalid = app.post(&uri, bad_score, Some(&ana.access)).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let ok = app.post(&uri, checkout_body(), Some(&ana.access)).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.body["data"]["review_id"].is_number());

    let again = app.post(&uri, checkout_body(), Some(&ana.access)).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let visits = app.get("/api/v1/visits/me", Some(&ana.access)).await;
    assert_eq!(visits.body["data"][0]["status"], "completed");
    assert!(visits.body["data"][0]["checked_out_at"].is_string());
}

#[tokio::test]
async fn test_checkout_ownership_is_checked_before_scores() {
    let app = spawn_app().await;
    app.add_location("QR-1", LocationStatus::Approved, &[]).await;
    let ana = app.signed_in_user("ana").await;
    let luis = app.signed_in_user("luis").await;

    let checkin = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "QR-1" }), Some(&ana.access))
        .await;
    let visit_id = checkin.body["data"]["visit_id"].as_i64().unwrap();

    let mut bad_score = checkout_body();
    bad_score["service_score"] = json!(0);

    let foreign = app
        .post(
            &format!("/api/v1/visits/{visit_id}/checkout"),
            bad_score.clone(),
            Some(&luis.access),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let missing = app
        .post("/api/v1/visits/9999/checkout", bad_score, Some(&ana.access))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let app = spawn_app().await;
    app.add_location("QR-1", LocationStatus::Approved, &[]).await;
    let tokens = app.signed_in_user("ana").await;

    let checkin = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "QR-1" }), Some(&tokens.access))
        .await;
    let visit_id = checkin.body["data"]["visit_id"].as_i64().unwrap();
    let uri = format!("/api/v1/visits/{visit_id}/checkout");

    let mut missing_score = checkout_body();
    missing_score.as_object_mut().unwrap().remove("price_score");
    let response = app.post(&uri, missing_score, Some(&tokens.access)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    let mut text_score = checkout_body();
    text_score["vibe_score"] = json!("five");
    let response = app.post(&uri, text_score, Some(&tokens.access)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    let response = app
        .post("/api/v1/visits/abc/checkout", checkout_body(), Some(&tokens.access))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method("POST")
        .uri(&uri)
        .header("Authorization", format!("Bearer {}", tokens.access))
        .body(Body::from("service_score=5"))
        .unwrap();
    let response = read_response(app.router.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    // The visit is still open after all the rejected attempts.
    let response = app.post(&uri, checkout_body(), Some(&tokens.access)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_vibe_match_defaults_and_full_overlap() {
    let app = spawn_app().await;
    app.add_mood("chill").await;
    app.add_mood("cultural").await;
    let visited = app
        .add_location("QR-1", LocationStatus::Approved, &["chill", "cultural"])
        .await;
    let target = app
        .add_location("QR-2", LocationStatus::Approved, &["chill", "cultural"])
        .await;
    let moodless = app.add_location("QR-3", LocationStatus::Approved, &[]).await;
    let tokens = app.signed_in_user("ana").await;

    let uri = format!("/api/v1/locations/{}/vibe-match", target.id);

    let response = app.get(&uri, Some(&tokens.access)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["vibe_match"], 70);

    let checkin = app
        .post("/api/v1/visits/checkin", json!({ "qr_code": "QR-1" }), Some(&tokens.access))
        .await;
    let visit_id = checkin.body["data"]["visit_id"].as_i64().unwrap();

    // An active visit is not history yet.
    let response = app.get(&uri, Some(&tokens.access)).await;
    assert_eq!(response.body["data"]["vibe_match"], 70);

    app.post(
        &format!("/api/v1/visits/{visit_id}/checkout"),
        checkout_body(),
        Some(&tokens.access),
    )
    .await;

    let response = app.get(&uri, Some(&tokens.access)).await;
    assert_eq!(response.body["data"]["vibe_match"], 100);

    let response = app
        .get(
            &format!("/api/v1/locations/{}/vibe-match", moodless.id),
            Some(&tokens.access),
        )
        .await;
    assert_eq!(response.body["data"]["vibe_match"], 70);

    let response = app
        .get(
            &format!("/api/v1/locations/{}/vibe-match", visited.id),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_favorites_toggle_list_and_delete() {
    let app = spawn_app().await;
    let location = app.add_location("QR-1", LocationStatus::Approved, &[]).await;
    let tokens = app.signed_in_user("ana").await;
    let body = json!({ "location_id": location.id });

    let created = app.post("/api/v1/favorites", body.clone(), Some(&tokens.access)).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["data"]["is_favorite"], true);

    let mine = app.get("/api/v1/favorites/me", Some(&tokens.access)).await;
    assert_eq!(mine.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(mine.body["data"][0]["location"]["id"], location.id);

    let removed = app.post("/api/v1/favorites", body.clone(), Some(&tokens.access)).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["data"]["is_favorite"], false);

    app.post("/api/v1/favorites", body, Some(&tokens.access)).await;
    let uri = format!("/api/v1/favorites/{}", location.id);
    let deleted = app.request("DELETE", &uri, None, Some(&tokens.access)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let deleted_again = app.request("DELETE", &uri, None, Some(&tokens.access)).await;
    assert_eq!(deleted_again.status, StatusCode::NO_CONTENT);

    let mine = app.get("/api/v1/favorites/me", Some(&tokens.access)).await;
    assert!(mine.body["data"].as_array().unwrap().is_empty());

    let unknown = app
        .post("/api/v1/favorites", json!({ "location_id": 9999 }), Some(&tokens.access))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

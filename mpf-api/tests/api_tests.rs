//! Integration tests for mpf-api HTTP endpoints
//!
//! Tests cover:
//! - Health endpoint (no identity required)
//! - Identity header enforcement
//! - Library add/list/remove and its business rules
//! - Blocked tracks with expiry and conflict rules
//! - Recommendation request validation and a full successful request
//! - Catalog pass-through endpoints

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

use common::{candidate, tid, track, FakeCatalog, FakeGenerator, USER};
use mpf_api::{build_router, AppState};
use mpf_common::config::LibraryConfig;
use mpf_common::db::init_memory_database;

/// Test helper: router over an in-memory database and fake gateways
async fn setup_app(catalog: FakeCatalog, generator: FakeGenerator) -> Router {
    setup_app_with(catalog, generator, LibraryConfig::default()).await
}

async fn setup_app_with(
    catalog: FakeCatalog,
    generator: FakeGenerator,
    library: LibraryConfig,
) -> Router {
    let db = init_memory_database().await.expect("in-memory database");
    let state = AppState::new(db, Arc::new(catalog), Arc::new(generator), &library);
    build_router(state)
}

async fn default_app() -> Router {
    let mut catalog = FakeCatalog::new();
    for i in 0..=12 {
        catalog = catalog.with_track(track(&tid(i), &format!("Song {}", i), &format!("Band {}", i)));
    }
    let generator = FakeGenerator::new(
        (1..=12)
            .map(|i| candidate(&format!("Song {}", i), &format!("Band {}", i), 0.8))
            .collect(),
    );
    setup_app(catalog, generator).await
}

/// Test helper: request carrying the identity header
fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", USER);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: send and return (status, JSON body)
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

async fn add_to_library(app: &Router, id: &str) -> StatusCode {
    let (status, _) = send(
        app,
        request("POST", "/library", Some(json!({ "spotify_track_id": id }))),
    )
    .await;
    status
}

// =============================================================================
// Health and identity
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let app = default_app().await;

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mpf-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = default_app().await;

    for header in [None, Some("   ")] {
        let mut builder = Request::builder().uri("/library");
        if let Some(value) = header {
            builder = builder.header("x-user-id", value);
        }
        let (status, body) = send(&app, builder.body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
}

// =============================================================================
// Library
// =============================================================================

#[tokio::test]
async fn test_library_add_list_and_duplicate() {
    let app = default_app().await;

    let (status, entry) = send(
        &app,
        request("POST", "/library", Some(json!({ "spotify_track_id": tid(1) }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["spotify_track_id"], tid(1));
    assert_eq!(entry["user_id"], USER);

    assert_eq!(add_to_library(&app, &tid(2)).await, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        request("POST", "/library", Some(json!({ "spotify_track_id": tid(1) }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DUPLICATE_TRACK");

    let (status, body) = send(&app, request("GET", "/library?limit=1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["tracks"].as_array().unwrap().len(), 1);
    assert_eq!(body["tracks"][0]["spotify_track_id"], tid(2));
}

#[tokio::test]
async fn test_library_invalid_id_is_validation_error() {
    let app = default_app().await;

    let (status, body) = send(
        &app,
        request("POST", "/library", Some(json!({ "spotify_track_id": "too-short" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["fields"][0]["field"], "spotify_track_id");

    let padded = format!(" {} ", tid(1));
    let (status, body) = send(
        &app,
        request("POST", "/library", Some(json!({ "spotify_track_id": padded }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"][0]["field"], "spotify_track_id");
}

#[tokio::test]
async fn test_cannot_remove_last_library_track() {
    let app = default_app().await;
    add_to_library(&app, &tid(1)).await;

    let (status, body) = send(&app, request("DELETE", &format!("/library/{}", tid(1)), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "LAST_TRACK");

    add_to_library(&app, &tid(2)).await;
    let (status, body) = send(&app, request("DELETE", &format!("/library/{}", tid(1)), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _) = send(&app, request("DELETE", &format!("/library/{}", tid(1)), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blocked_track_rejected_from_library_when_enabled() {
    let app = setup_app_with(
        FakeCatalog::new(),
        FakeGenerator::new(Vec::new()),
        LibraryConfig {
            reject_blocked_tracks: true,
        },
    )
    .await;

    let (status, _) = send(
        &app,
        request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(5) }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        request("POST", "/library", Some(json!({ "spotify_track_id": tid(5) }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "TRACK_BLOCKED");
}

// =============================================================================
// Blocked tracks
// =============================================================================

#[tokio::test]
async fn test_block_with_duration() {
    let app = default_app().await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/blocked-tracks",
            Some(json!({ "spotify_track_id": tid(3), "duration": "7d" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["spotify_track_id"], tid(3));
    assert_eq!(body["duration"], "7d");

    let created: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(body["created_at"].clone()).unwrap();
    let expires: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(body["expires_at"].clone()).unwrap();
    assert_eq!(expires - created, chrono::Duration::hours(168));

    let (status, body) = send(
        &app,
        request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(4) }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["duration"], "permanent");
    assert!(body["expires_at"].is_null());
}

#[tokio::test]
async fn test_block_conflicts() {
    let app = default_app().await;
    add_to_library(&app, &tid(1)).await;

    let (status, body) = send(
        &app,
        request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(1), "duration": "1d" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "TRACK_IN_LIBRARY");

    let block = || request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(2) })));
    assert_eq!(send(&app, block()).await.0, StatusCode::CREATED);

    let (status, body) = send(&app, block()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_TRACK");

    let (status, body) = send(
        &app,
        request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(3), "duration": "forever" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"][0]["field"], "duration");
}

#[tokio::test]
async fn test_list_and_unblock() {
    let app = default_app().await;
    for i in [1, 2] {
        send(
            &app,
            request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(i), "duration": "1d" }))),
        )
        .await;
    }

    let (status, body) = send(&app, request("GET", "/blocked-tracks?active_only=true", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["blocked_tracks"][0]["spotify_track_id"], tid(2));
    assert_eq!(body["blocked_tracks"][0]["is_active"], true);

    let (status, _) = send(&app, request("DELETE", &format!("/blocked-tracks/{}", tid(1)), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("DELETE", &format!("/blocked-tracks/{}", tid(1)), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TRACK_NOT_FOUND");

    let (_, body) = send(&app, request("GET", "/blocked-tracks", None)).await;
    assert_eq!(body["total_count"], 1);
}

// =============================================================================
// Recommendations
// =============================================================================

fn recommendation_body(base: &str, count: Option<i64>) -> Value {
    let mut body = json!({
        "base_track_id": base,
        "description": "thrashing riffs with a melancholic undertone",
        "temperature": 0.5,
    });
    if let Some(count) = count {
        body["count"] = json!(count);
    }
    body
}

#[tokio::test]
async fn test_recommendations_success() {
    let app = default_app().await;
    add_to_library(&app, &tid(0)).await;
    send(
        &app,
        request("POST", "/blocked-tracks", Some(json!({ "spotify_track_id": tid(1) }))),
    )
    .await;

    let (status, body) = send(
        &app,
        request("POST", "/recommendations", Some(recommendation_body(&tid(0), Some(5)))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 5);
    assert_eq!(recs[0]["spotify_track_id"], tid(2));
    assert!(recs.iter().all(|r| r["spotify_track_id"] != tid(0) && r["spotify_track_id"] != tid(1)));
    assert_eq!(recs[0]["recommendation_confidence"], 0.8);
    assert!(recs[0]["artist_bio"].is_string());
    assert_eq!(body["base_track"]["id"], tid(0));
    assert_eq!(body["generation_metadata"]["excluded_tracks_count"], 2);
    assert_eq!(body["generation_metadata"]["model_used"], "fake-model");
}

#[tokio::test]
async fn test_recommendations_base_not_in_library() {
    let app = default_app().await;
    add_to_library(&app, &tid(0)).await;

    let (status, body) = send(
        &app,
        request("POST", "/recommendations", Some(recommendation_body(&tid(7), None))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_recommendations_base_unknown_to_catalog() {
    // In the library, but the catalog has no such track
    let app = setup_app(FakeCatalog::new(), FakeGenerator::new(Vec::new())).await;
    assert_eq!(add_to_library(&app, &tid(0)).await, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        request("POST", "/recommendations", Some(recommendation_body(&tid(0), None))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UPSTREAM_NOT_FOUND");
    assert_eq!(body["error"]["message"], "spotify resource not found");
}

#[tokio::test]
async fn test_recommendations_validation() {
    let app = default_app().await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/recommendations",
            Some(json!({
                "base_track_id": tid(0),
                "description": "too short",
                "temperature": 2.0,
                "count": 60,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<_> = body["error"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["description", "temperature", "count"]);

    let malformed = Request::builder()
        .method("POST")
        .uri("/recommendations")
        .header("x-user-id", USER)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_recommendations_nothing_matches() {
    let catalog = FakeCatalog::new().with_track(track(&tid(0), "Seed", "Seed Band"));
    let generator = FakeGenerator::new(vec![candidate("Unknown", "Nobody", 0.5)]);
    let app = setup_app(catalog, generator).await;
    add_to_library(&app, &tid(0)).await;

    let (status, body) = send(
        &app,
        request("POST", "/recommendations", Some(recommendation_body(&tid(0), None))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "no matching tracks found");
}

// =============================================================================
// Catalog pass-through
// =============================================================================

#[tokio::test]
async fn test_track_search_and_lookup() {
    let app = default_app().await;

    let (status, body) = send(&app, request("GET", "/tracks/search?q=song%201&limit=2", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracks"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, request("GET", "/tracks/search?q=%20", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"][0]["field"], "q");

    let (status, body) = send(&app, request("GET", &format!("/tracks/{}", tid(4)), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Song 4");

    let (status, body) = send(&app, request("GET", &format!("/tracks/{}", tid(99)), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{FakePrimary, FakeSecondary, temp_store};
use episoda::config::Config;
use episoda::db::Store;
use episoda::models::{EpisodeInput, ShowInput};
use episoda::state::SharedState;
use http_body_util::BodyExt;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Store,
    secondary: Arc<FakeSecondary>,
}

async fn spawn_app() -> TestApp {
    let store = temp_store().await;
    let secondary = Arc::new(FakeSecondary::default());
    let shared = Arc::new(SharedState::with_catalogs(
        Config::default(),
        store.clone(),
        Arc::new(FakePrimary::default()),
        secondary.clone(),
    ));

    let state = episoda::api::create_app_state(shared, None);
    TestApp {
        router: episoda::api::router(state).await,
        store,
        secondary,
    }
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn seed_severance(app: &TestApp) -> (String, String) {
    let show = app
        .store
        .seed_show(&ShowInput {
            trakt_id: 41793,
            title: "Severance".to_string(),
            tvmaze_id: Some(44933),
            ..ShowInput::default()
        })
        .await
        .unwrap();
    let episode = app
        .store
        .seed_episode(
            &show.id,
            &EpisodeInput {
                season_number: 2,
                episode_number: 1,
                title: "Hello, Ms. Cobel".to_string(),
                ..EpisodeInput::default()
            },
        )
        .await
        .unwrap();
    (show.id, episode.id)
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let (status, json) = send(&app.router, Method::GET, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["database"], true);
}

#[tokio::test]
async fn test_get_episode_by_composite_reference() {
    let app = spawn_app().await;
    let (_, episode_id) = seed_severance(&app).await;
    app.secondary
        .artwork
        .lock()
        .unwrap()
        .insert((44933, 2, 1), "https://img/s2e1.jpg".to_string());

    let (status, json) = send(
        &app.router,
        Method::GET,
        "/api/episodes/41793-S2E1?mode=silent",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["episode"]["id"], episode_id.as_str());
    assert_eq!(json["data"]["episode"]["artwork_url"], "https://img/s2e1.jpg");
    assert_eq!(json["data"]["show"]["tvmaze_id"], 44933);
    assert_eq!(json["data"]["mode"], "silent");
    assert_eq!(json["data"]["loading"], false);
}

#[tokio::test]
async fn test_get_episode_defaults_to_initial_mode() {
    let app = spawn_app().await;
    let (_, episode_id) = seed_severance(&app).await;

    let (status, json) = send(
        &app.router,
        Method::GET,
        &format!("/api/episodes/{episode_id}"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["mode"], "initial");
    assert_eq!(json["data"]["loading"], true);
}

#[tokio::test]
async fn test_unknown_episode_is_404() {
    let app = spawn_app().await;

    let (status, json) = send(
        &app.router,
        Method::GET,
        "/api/episodes/does-not-exist",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_invalid_mode_is_rejected() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app.router,
        Method::GET,
        "/api/episodes/41793-S2E1?mode=focus",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_view_reflects_latest_run() {
    let app = spawn_app().await;
    seed_severance(&app).await;

    send(
        &app.router,
        Method::GET,
        "/api/episodes/41793-S2E1?mode=manual",
    )
    .await;
    let (status, json) = send(&app.router, Method::GET, "/api/view").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["reference"], "41793-S2E1");
    assert_eq!(json["data"]["loading"], false);
    assert_eq!(json["data"]["result"]["status"], "resolved");
}

#[tokio::test]
async fn test_backfill_show_artwork() {
    let app = spawn_app().await;
    let (show_id, _) = seed_severance(&app).await;
    app.secondary
        .artwork
        .lock()
        .unwrap()
        .insert((44933, 2, 1), "https://img/s2e1.jpg".to_string());

    let (status, json) = send(
        &app.router,
        Method::POST,
        &format!("/api/shows/{show_id}/artwork/backfill"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["secondary_id"], 44933);
    assert_eq!(json["data"]["episodes_checked"], 1);
    assert_eq!(json["data"]["artwork_found"], 1);

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/api/shows/unknown/artwork/backfill",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("Metrics not enabled"));
}

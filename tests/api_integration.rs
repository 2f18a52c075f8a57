//! HTTP surface: ranking reads, refresh trigger and error mapping

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use toplytics::api::create_api_router;
use toplytics::auth::AuthService;
use toplytics::config::AuthConfig;
use toplytics::models::TimeWindow;
use tower::ServiceExt;

use common::{harness, rows, selected_harness, Harness};

const WINDOWS: [TimeWindow; 2] = [TimeWindow::Today, TimeWindow::Week];

fn router(h: &Harness, api_keys: &[&str]) -> Router {
    let auth = AuthService::new(&AuthConfig {
        api_keys: api_keys.iter().map(|k| k.to_string()).collect(),
    });
    create_api_router(Arc::clone(h.context.cache()), Arc::new(auth))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

fn many_rows(n: u64) -> Vec<(String, u64)> {
    (0..n).map(|i| (format!("/post-{i}"), 100 - i)).collect()
}

#[tokio::test]
async fn test_health_reports_cache_state() {
    let h = selected_harness(&WINDOWS).await;

    let (status, json) = send(router(&h, &[]), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    assert_eq!(json["cache"]["state"], "empty");
}

#[tokio::test]
async fn test_ranking_defaults_to_five_entries() {
    let h = selected_harness(&WINDOWS).await;
    h.client.respond(TimeWindow::Today, many_rows(30));

    let (status, json) = send(router(&h, &[]), get("/api/rankings/today")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["window"], "today");
    assert_eq!(json["total"], 5);
    assert_eq!(json["entries"][0]["path"], "/post-0");
    assert_eq!(json["entries"][0]["views"], 100);
}

#[tokio::test]
async fn test_ranking_limit_is_clamped() {
    let h = selected_harness(&WINDOWS).await;
    h.client.respond(TimeWindow::Week, many_rows(30));

    let (_, json) = send(router(&h, &[]), get("/api/rankings/week?limit=100")).await;
    assert_eq!(json["total"], 25);

    let (_, json) = send(router(&h, &[]), get("/api/rankings/week?limit=0")).await;
    assert_eq!(json["total"], 1);

    // Both reads after the first came from cache
    assert_eq!(h.client.calls(), 2);
}

#[tokio::test]
async fn test_unknown_window_is_not_found() {
    let h = selected_harness(&WINDOWS).await;

    let (status, json) = send(router(&h, &[]), get("/api/rankings/month")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown time window 'month'");
    assert_eq!(h.client.calls(), 0);
}

#[tokio::test]
async fn test_missing_view_is_conflict() {
    let h = harness(&WINDOWS);

    let (status, _) = send(router(&h, &[]), get("/api/rankings/today")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_remote_failure_without_data_is_unavailable() {
    let h = selected_harness(&WINDOWS).await;
    h.client.set_failing(true);

    let (status, json) = send(router(&h, &[]), get("/api/rankings/today")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "no analytics data available yet");
}

#[tokio::test]
async fn test_refresh_requires_api_key_when_configured() {
    let h = selected_harness(&WINDOWS).await;

    let (status, _) = send(router(&h, &["s3cret"]), post("/api/refresh", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(router(&h, &["s3cret"]), post("/api/refresh", Some("nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.client.calls(), 0);

    // Reads stay open
    let (status, _) = send(router(&h, &["s3cret"]), get("/api/rankings/today")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_summarises_windows() {
    let h = selected_harness(&WINDOWS).await;
    h.client.respond(TimeWindow::Today, rows(&[("/a", 3), ("/b", 1)]));

    let (status, json) = send(router(&h, &["s3cret"]), post("/api/refresh", Some("s3cret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view_id"], "42");
    assert_eq!(json["windows"][0]["window"], "today");
    assert_eq!(json["windows"][0]["entries"], 2);
    assert_eq!(json["windows"][1]["window"], "week");
    assert_eq!(json["windows"][1]["entries"], 0);
    assert_eq!(h.client.calls(), 2);
}

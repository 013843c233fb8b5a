use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use khl_stats::api::{create_router, AppState};
use khl_stats::{
    parse_season_page, IndexCache, IndexSource, KhlError, PlayerRecord, Result, Season, SeasonKey,
};

const SEASON_PAGE: &str = include_str!("fixtures/season_page.html");

/// Serves the fixture page for every regular season and fails for playoffs.
#[derive(Default)]
struct FixtureSource {
    loads: AtomicUsize,
}

#[async_trait]
impl IndexSource for FixtureSource {
    async fn load(&self, key: SeasonKey) -> Result<Vec<PlayerRecord>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if key.mode.is_playoffs() {
            return Err(KhlError::UnexpectedStatus {
                url: "http://source.invalid".to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            });
        }
        parse_season_page(SEASON_PAGE, &key)
    }
}

fn app() -> (Router, Arc<FixtureSource>) {
    let source = Arc::new(FixtureSource::default());
    let cache = Arc::new(IndexCache::new(source.clone()));
    let default_season = Some(Season::from_end_year(2024));
    (create_router(AppState::new(cache, default_season)), source)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

#[tokio::test]
async fn test_search_returns_name_team_pairs() {
    let (app, _) = app();
    // "петров"
    let (status, body) = get(
        &app,
        "/api/search?q=%D0%BF%D0%B5%D1%82%D1%80%D0%BE%D0%B2&season=2023/2024",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let suggestions = body.as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0]["name"], "Петров Иван");
    assert_eq!(suggestions[0]["team"], "СКА");
    assert_eq!(suggestions[1]["name"], "Петров Сергей");
    assert!(suggestions[0].get("games").is_none());
}

#[tokio::test]
async fn test_search_with_empty_query_skips_source() {
    let (app, source) = app();
    let (status, body) = get(&app, "/api/search?q=&season=2023/2024").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
    assert_eq!(source.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stats_found() {
    let (app, _) = app();
    // "Овечкин Александр", season left to the default
    let (status, body) = get(
        &app,
        "/api/stats?player=%D0%9E%D0%B2%D0%B5%D1%87%D0%BA%D0%B8%D0%BD%20%D0%90%D0%BB%D0%B5%D0%BA%D1%81%D0%B0%D0%BD%D0%B4%D1%80",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Овечкин Александр");
    assert_eq!(body["team"], "Динамо Москва");
    assert_eq!(body["team_abbr"], "ДИН");
    assert_eq!(body["position"], "forward");
    assert_eq!(body["games"], 60);
    assert_eq!(body["points"], 50);
    assert_eq!(body["plus_minus"], 12);
    assert_eq!(body["penalty"], 24);
}

#[tokio::test]
async fn test_stats_ambiguous_surname() {
    let (app, _) = app();
    // "Петров"
    let (status, body) = get(
        &app,
        "/api/stats?player=%D0%9F%D0%B5%D1%82%D1%80%D0%BE%D0%B2&season=2023/2024",
    )
    .await;

    assert_eq!(status, StatusCode::MULTIPLE_CHOICES);
    assert!(body["error"].is_string());
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[1]["team"], "Трактор");
}

#[tokio::test]
async fn test_stats_not_found() {
    let (app, _) = app();
    let (status, body) = get(&app, "/api/stats?player=Gretzky&season=2023/2024").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Player not found");
    assert!(body.get("candidates").is_none());
}

#[tokio::test]
async fn test_stats_bad_requests() {
    let (app, _) = app();
    let (status, _) = get(&app, "/api/stats?season=2023/2024").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/stats?player=x&season=2023/2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2023/2025"));
}

#[tokio::test]
async fn test_source_failure_is_unavailable() {
    let (app, _) = app();
    let (status, body) = get(&app, "/api/stats?player=x&season=2023/2024&playoff=true").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
    assert!(body.get("name").is_none());

    let (status, _) = get(&app, "/api/search?q=x&season=2023/2024&playoff=1").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_concurrent_requests_fetch_once() {
    let (app, source) = app();
    let requests = (0..10).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { get(&app, "/api/search?q=a&season=2023/2024").await.0 })
    });
    for handle in requests.collect::<Vec<_>>() {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(source.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_and_clear_cache() {
    let (app, source) = app();
    get(&app, "/api/search?q=a&season=2023/2024").await;

    let (status, body) = send(&app, Method::POST, "/api/cache/refresh?season=2023/2024").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["season"], "2023/2024");
    assert_eq!(body["playoff"], false);
    assert_eq!(body["players"], 3);
    assert_eq!(source.loads.load(Ordering::SeqCst), 2);

    let (status, _) = send(&app, Method::DELETE, "/api/cache").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    get(&app, "/api/search?q=a&season=2023/2024").await;
    assert_eq!(source.loads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

// Route table for the dashboard API
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, latest_data, list_devices, query_data, stream_events, tank_settings,
    trends_data, update_tank_settings,
};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/latest", get(latest_data))
        .route("/api/devices", get(list_devices))
        .route("/api/query", get(query_data))
        .route("/api/trends", get(trends_data))
        .route(
            "/api/tank-settings",
            get(tank_settings).post(update_tank_settings),
        )
        .route("/api/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device_registry::DeviceRegistry;
    use crate::application::fake_repository::{FakeRepository, raw_series};
    use crate::application::metric_cache::MetricCache;
    use crate::application::range_service::RangeService;
    use crate::application::snapshot_service::{EmptyResultPolicy, SnapshotService};
    use crate::application::streaming_service::{StreamSettings, StreamingService};
    use crate::application::tank_settings::TankSettingsService;
    use crate::application::timeseries_repository::{QueryError, TimeSeriesRepository};
    use crate::domain::tank::TankCalibration;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn app(repo: FakeRepository) -> Router {
        let repo: Arc<dyn TimeSeriesRepository> = Arc::new(repo);
        let metrics: Vec<String> = ["temperature", "pH", "distance"]
            .iter()
            .map(|m| m.to_string())
            .collect();
        let devices = DeviceRegistry::new(repo.clone(), "temperature".into(), "plt-404cca470da0".into());
        let tank = TankSettingsService::new(TankCalibration::default());
        let snapshots = SnapshotService::new(
            repo.clone(),
            Arc::new(MetricCache::new()),
            devices.clone(),
            tank.clone(),
            metrics.clone(),
            EmptyResultPolicy::NoData,
        );
        let streaming = StreamingService::new(
            Arc::new(snapshots.clone()),
            StreamSettings {
                poll_interval: Duration::from_millis(20),
                session_max: Duration::from_millis(100),
                reconnect_after: Duration::from_millis(100),
                error_retry: Duration::from_millis(5000),
            },
        );

        build_router(Arc::new(AppState {
            snapshot_service: snapshots,
            range_service: RangeService::new(repo, metrics),
            device_registry: devices,
            tank_settings: tank,
            streaming_service: streaming,
            shutdown: CancellationToken::new(),
        }))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_latest_snapshot() {
        let repo = FakeRepository::new()
            .with_devices(&["d1"])
            .with_value("temperature", Some(22.5), 100)
            .with_value("distance", None, 100);
        let (status, body) = get_json(app(repo), "/api/latest").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deviceID"], "d1");
        assert_eq!(body["timestamp"], 100);
        assert_eq!(body["metrics"]["temperature"], 22.5);
        assert!(body["metrics"]["distance"].is_null());
        assert!(body["metrics"].get("pH").is_none());
        assert_eq!(body["waterLevel"], 50.0);
    }

    #[tokio::test]
    async fn test_latest_survives_dead_store() {
        let down = || QueryError::Transport("connection refused".into());
        let repo = FakeRepository::new()
            .with_anchor(Err(down()))
            .with_instant("temperature", Err(down()))
            .with_instant("pH", Err(down()))
            .with_instant("distance", Err(down()));
        let (status, body) = get_json(app(repo), "/api/latest").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deviceID"], "plt-404cca470da0");
        assert_eq!(body["metrics"], json!({}));
        assert_eq!(body["stale"], true);
    }

    #[tokio::test]
    async fn test_devices() {
        let repo = FakeRepository::new().with_devices(&["a", "b", "a"]);
        let (_, body) = get_json(app(repo), "/api/devices").await;
        assert_eq!(body, json!({"status": "success", "devices": ["a", "b"]}));
    }

    #[tokio::test]
    async fn test_query_range() {
        let repo = FakeRepository::new().with_range(
            "pH",
            Ok(vec![raw_series(&[(60, "7.1"), (60, "7.3"), (120, "NaN")])]),
        );
        let (status, body) = get_json(app(repo), "/api/query?metric=pH&device=d1&minutes=60").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(
            body["data"],
            json!({"metric": "pH", "points": [[60, 7.1], [120, null]]})
        );
    }

    #[tokio::test]
    async fn test_query_rejects_injection() {
        let (status, body) =
            get_json(app(FakeRepository::new()), "/api/query?metric=pH%7Bjob%3D%22x%22%7D").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_trends_defaults_and_failures() {
        let repo = FakeRepository::new()
            .with_range("temperature", Ok(vec![raw_series(&[(60, "20")])]))
            .with_range("pH", Err(QueryError::Timeout(Duration::from_secs(10))));
        let (status, body) = get_json(app(repo), "/api/trends?minutes=bogus").await;

        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_object().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data["temperature"]["points"], json!([[60, 20.0]]));
        assert_eq!(data["pH"]["points"], json!([]));
    }

    #[tokio::test]
    async fn test_trends_explicit_list() {
        let (_, body) =
            get_json(app(FakeRepository::new()), "/api/trends?metrics=EC,,TDS&minutes=10080").await;
        let keys: Vec<&String> = body["data"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["EC", "TDS"]);
    }

    #[tokio::test]
    async fn test_tank_settings_partial_update() {
        let app = app(FakeRepository::new());
        let (status, body) = post(
            app.clone(),
            "/api/tank-settings",
            r#"{"maxDistance": -1, "alertLevel": 15}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["alertLevel"], 15.0);
        assert_eq!(body["config"]["maxDistance"], 3.0);
        assert_eq!(body["applied"], json!(["alertLevel"]));
        assert_eq!(body["rejected"], json!(["maxDistance"]));

        let (_, current) = get_json(app, "/api/tank-settings").await;
        assert_eq!(current["alertLevel"], 15.0);
    }

    #[tokio::test]
    async fn test_tank_settings_structural_failures() {
        let app = app(FakeRepository::new());

        let (status, body) = post(app.clone(), "/api/tank-settings", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, _) = post(app, "/api/tank-settings", "[1, 2, 3]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tank_level_follows_calibration() {
        let repo = FakeRepository::new()
            .with_devices(&["d1"])
            .with_value("distance", Some(1.25), 100);
        let app = app(repo);

        post(
            app.clone(),
            "/api/tank-settings",
            r#"{"maxDistance": 2.0, "minDistance": 1.0}"#,
        )
        .await;
        let (_, body) = get_json(app, "/api/latest").await;
        assert_eq!(body["waterLevel"], 75.0);
    }

    #[tokio::test]
    async fn test_events_stream_then_reconnect_hint() {
        let repo = FakeRepository::new()
            .with_devices(&["d1"])
            .with_value("temperature", Some(22.5), 100);
        let response = app(repo)
            .oneshot(Request::get("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains(r#""status":"connected""#), "{text}");
        assert_eq!(text.matches(r#""deviceID":"d1""#).count(), 1, "{text}");
        let last = text.trim_end().lines().last().unwrap_or_default();
        assert!(last.starts_with("retry:"), "{text}");
        assert_eq!(last["retry:".len()..].trim(), "100", "{text}");
    }
}

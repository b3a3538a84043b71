// HTTP request handlers
use crate::application::range_service::DEFAULT_WINDOW_MINUTES;
use crate::infrastructure::http_response::{ApiError, json_success};
use crate::infrastructure::sse::stream_from_receiver;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

const DEFAULT_RANGE_METRIC: &str = "temperature";

#[derive(Deserialize)]
pub struct RangeQuery {
    pub metric: Option<String>,
    pub device: Option<String>,
    pub minutes: Option<String>,
}

#[derive(Deserialize)]
pub struct TrendsQuery {
    pub metrics: Option<String>,
    pub device: Option<String>,
    pub minutes: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current values for the default device
pub async fn latest_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot_service.build_snapshot().await)
}

/// List all discovered devices
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let devices = state
        .device_registry
        .discover(Utc::now().timestamp())
        .await;
    json_success(json!({"devices": devices}))
}

/// History of one metric
pub async fn query_data(
    Query(query): Query<RangeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = query.metric.as_deref().unwrap_or(DEFAULT_RANGE_METRIC);
    let minutes = parse_minutes(query.minutes.as_deref());

    let series = state
        .range_service
        .query(metric, device_filter(&query.device), minutes)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(json_success(json!({"data": series})))
}

/// History of several metrics over the same window
pub async fn trends_data(
    Query(query): Query<TrendsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let metrics: Vec<String> = match query.metrics.as_deref() {
        Some(list) => list.split(',').map(str::to_string).collect(),
        None => state.range_service.default_metrics().to_vec(),
    };
    let minutes = parse_minutes(query.minutes.as_deref());

    let trends = state
        .range_service
        .trends(&metrics, device_filter(&query.device), minutes)
        .await;

    json_success(json!({"data": trends}))
}

pub async fn tank_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.tank_settings.current().await)
}

/// Partial update: valid fields apply, invalid ones are reported back
pub async fn update_tank_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let update = state
        .tank_settings
        .update(&input)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(json_success(json!({
        "config": update.calibration,
        "applied": update.applied,
        "rejected": update.rejected,
    })))
}

/// Push stream of snapshots for the live dashboard
pub async fn stream_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cancel = state.shutdown.child_token();
    let session = state.streaming_service.open(cancel.clone());
    stream_from_receiver(session.events, cancel.drop_guard())
}

fn parse_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|m| m.trim().parse().ok())
        .unwrap_or(DEFAULT_WINDOW_MINUTES)
}

fn device_filter(device: &Option<String>) -> Option<&str> {
    device.as_deref().map(str::trim).filter(|d| !d.is_empty())
}

// HTTP response utilities for the dashboard JSON API
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Client-facing failures. Store problems never surface here; they are
/// absorbed into degraded results before reaching a handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        tracing::warn!("Rejecting request: {}", self);
        let body = Json(json!({"status": "error", "message": self.to_string()}));
        (status, body).into_response()
    }
}

/// Wrap the fields of `payload` in the `{"status":"success", ...}`
/// envelope the dashboard expects. Non-object payloads go under `data`.
pub fn json_success(payload: Value) -> Json<Value> {
    let mut body = match payload {
        Value::Object(fields) => fields,
        other => {
            let mut fields = serde_json::Map::new();
            fields.insert("data".to_string(), other);
            fields
        }
    };
    body.insert("status".to_string(), Value::from("success"));
    Json(Value::Object(body))
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::client::TelemetryClient;
use crate::store::LatestValueStore;

/// State shared across handlers: the snapshot reader and the command path
/// back to the vehicle.
#[derive(Clone)]
pub struct AppState {
    pub store: LatestValueStore,
    pub client: Arc<TelemetryClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sensor/:field", get(sensor_value))
        .route("/command", post(send_command))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// `GET /sensor/{field}` returns the field's current value as a single-key
/// object, or 404 when the snapshot carries no such field.
async fn sensor_value(
    State(state): State<AppState>,
    Path(field): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match state.store.read(&field) {
        Ok(value) => {
            let mut body = serde_json::Map::new();
            body.insert(field, Value::from(value));
            Ok(Json(Value::Object(body)))
        }
        Err(e) => Err((StatusCode::NOT_FOUND, e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct CommandForm {
    pub action: String,
}

/// `POST /command` forwards the named action over the command channel and
/// echoes an acknowledgment.
async fn send_command(
    State(state): State<AppState>,
    Form(form): Form<CommandForm>,
) -> Result<String, (StatusCode, String)> {
    info!(action = %form.action, "command received");
    state
        .client
        .publish_command(&form.action)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(format!("command sent: {}", form.action))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

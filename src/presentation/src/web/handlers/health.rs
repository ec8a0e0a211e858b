//! Health check handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::web::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "k2sobot",
        "version": env!("CARGO_PKG_VERSION"),
        "gemini_available": state.gemini_available,
        "timestamp": chrono::Local::now().to_rfc3339()
    }))
}

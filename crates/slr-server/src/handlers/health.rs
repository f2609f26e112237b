use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn extension_health() -> Json<Value> {
    Json(json!({ "status": "connected", "version": env!("CARGO_PKG_VERSION") }))
}

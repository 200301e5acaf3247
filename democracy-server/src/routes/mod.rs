pub mod v1;

use axum::{Json, Router};
use serde_json::{Value, json};

use crate::AppState;

/// Create the main API router with all versions
pub fn create_api_router(state: AppState) -> Router<AppState> {
    // Route constants carry the version prefix, so versions merge rather than nest.
    Router::new().merge(v1::create_v1_router(state))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

//! # Democracy Server
//!
//! HTTP admin service for the profile records and identity accounts of the
//! Democracy voting application.
//!
//! Every user-management endpoint requires a bearer session of an account in
//! the `Admin` role. Sessions are issued by `POST /api/v1/auth/login`.
//! Uploaded photos are served read-only under `/content/photos`.

pub mod groups;
pub mod infra;
pub mod routes;
pub mod users;

pub use infra::app_state::AppState;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use democracy_core::api::{routes::PHOTOS_PREFIX, v1};

/// Assemble the full application router.
pub fn create_app(state: AppState) -> Router {
    let photos = ServeDir::new(state.config().storage.photos_dir.clone());

    let mut app = Router::new()
        .route(v1::health::CHECK, get(routes::health_check))
        .merge(routes::create_api_router(state.clone()))
        .nest_service(PHOTOS_PREFIX, photos)
        .layer(TraceLayer::new_for_http());

    if state.config().dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

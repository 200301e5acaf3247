use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;

use democracy_core::api::v1;

use crate::{
    AppState,
    groups::handlers as group_handlers,
    users::{admin_handlers, auth},
};

/// Room for the text fields and multipart framing around a photo.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::auth::LOGIN, post(auth::handlers::login))
        .merge(create_session_routes(state.clone()))
        .merge(create_user_admin_routes(state.clone()))
        .merge(create_membership_routes(state))
}

/// Routes for any signed-in account
fn create_session_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::auth::LOGOUT, post(auth::handlers::logout))
        .route(v1::auth::ME, get(auth::handlers::me))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::middleware::auth_middleware,
        ))
}

/// User administration (admin only)
fn create_user_admin_routes(state: AppState) -> Router<AppState> {
    let body_limit = state.config().storage.max_photo_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route(
            v1::users::COLLECTION,
            get(admin_handlers::list_users).post(admin_handlers::create_user),
        )
        .route(
            v1::users::ITEM,
            get(admin_handlers::get_user)
                .put(admin_handlers::update_user)
                .delete(admin_handlers::delete_user),
        )
        .route(v1::users::EDIT, get(admin_handlers::edit_user_form))
        .route(v1::users::TOGGLE_ADMIN, post(admin_handlers::toggle_admin))
        .route_layer(DefaultBodyLimit::disable())
        .route_layer(RequestBodyLimitLayer::new(body_limit))
        .route_layer(middleware::from_fn(auth::middleware::require_admin))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::middleware::auth_middleware,
        ))
}

/// Groups, votings and the links to profiles (admin only)
fn create_membership_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::groups::COLLECTION, post(group_handlers::create_group))
        .route(v1::groups::MEMBERS, post(group_handlers::add_group_member))
        .route(v1::votings::COLLECTION, post(group_handlers::create_voting))
        .route(v1::votings::CANDIDATES, post(group_handlers::add_candidate))
        .route_layer(middleware::from_fn(auth::middleware::require_admin))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::middleware::auth_middleware,
        ))
}

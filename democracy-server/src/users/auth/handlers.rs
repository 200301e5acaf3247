use axum::{
    Extension, Json,
    extract::State,
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use democracy_core::api::ApiResponse;

use super::{middleware::extract_bearer_token, service::AuthenticatedAccount};
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub caller: AuthenticatedAccount,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let (token, caller) = state
        .auth()
        .login(&request.user_name, &request.password)
        .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: token.token,
        expires_at: token.expires_at,
        caller,
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<()>>> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;
    state.auth().logout(token).await?;

    Ok(Json(
        ApiResponse::success(()).with_message("Logged out".to_string()),
    ))
}

pub async fn me(
    Extension(caller): Extension<AuthenticatedAccount>,
) -> Json<ApiResponse<AuthenticatedAccount>> {
    Json(ApiResponse::success(caller))
}

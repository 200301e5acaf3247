use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use tracing::info;

use democracy_core::{
    api::ApiResponse,
    domain::users::{AdminToggle, User, UserDetails, UserEditView, UserId, UserIndexEntry},
};

use super::{auth::AuthenticatedAccount, form::read_user_form};
use crate::infra::{app_state::AppState, errors::AppResult};

/// Every profile with its admin flag and relation counts (admin only)
pub async fn list_users(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserIndexEntry>>>> {
    let users = state.users().list().await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ApiResponse<UserDetails>>> {
    let details = state.users().details(user_id).await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Values to pre-fill the edit form with
pub async fn edit_user_form(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ApiResponse<UserEditView>>> {
    let view = state.users().edit_view(user_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAccount>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let (form, photo) = read_user_form(multipart).await?;
    let user = state.users().create(&form, photo).await?;

    info!(
        admin = %admin.account.user_name,
        user_id = user.user_id,
        "admin created user"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<User>>> {
    let (form, photo) = read_user_form(multipart).await?;
    let user = state.users().update(user_id, &form, photo).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Delete a profile. Its identity account is left in place.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAccount>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.users().delete(user_id).await?;

    info!(admin = %admin.account.user_name, user_id, "admin deleted user");
    Ok(Json(
        ApiResponse::success(user).with_message("User deleted".to_string()),
    ))
}

pub async fn toggle_admin(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAccount>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<ApiResponse<AdminToggle>>> {
    let toggle = state.users().toggle_admin(user_id).await?;

    info!(
        admin = %admin.account.user_name,
        user_id,
        is_admin = toggle.is_admin,
        "admin role toggled"
    );
    Ok(Json(ApiResponse::success(toggle)))
}

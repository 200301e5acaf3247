use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use democracy_core::Role;

use super::service::{AuthError, AuthenticatedAccount};
use crate::infra::{app_state::AppState, errors::AppError};

/// Resolve the bearer token into an [`AuthenticatedAccount`] extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let caller = state.auth().authenticate(token).await?;
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

/// Reject callers lacking `role`. Must run after [`auth_middleware`].
pub async fn require_role(role: Role, request: Request, next: Next) -> Response {
    let Some(caller) = request.extensions().get::<AuthenticatedAccount>() else {
        return AppError::unauthorized("Authentication required").into_response();
    };

    if !caller.has_role(role) {
        tracing::warn!(
            account_id = %caller.account.id,
            role = role.as_str(),
            "access denied"
        );
        return AppError::forbidden(format!("{role} access required")).into_response();
    }

    next.run(request).await
}

pub async fn require_admin(request: Request, next: Next) -> Response {
    require_role(Role::Admin, request, next).await
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidSession => {
                AppError::unauthorized(err.to_string())
            }
            AuthError::Identity(_) => AppError::unexpected(err),
        }
    }
}

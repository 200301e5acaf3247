use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

use democracy_core::database::{
    IdentityError, MembershipError, ProfileRepositoryError,
};
use democracy_core::domain::users::{UserAdminError, ValidationErrors};

pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Per-field form errors, rendered as `error.fields`
    pub fields: Option<Value>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 400 listing every failing field.
    pub fn validation(errors: &ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "The submitted form is invalid".to_string(),
            fields: serde_json::to_value(&errors.errors).ok(),
        }
    }

    /// Attach a single form error to the response.
    pub fn with_field(mut self, field: &str) -> Self {
        self.fields = Some(json!([{ "field": field, "message": self.message }]));
        self
    }

    /// Log `err` and hide it behind a generic 500.
    pub fn unexpected(err: impl fmt::Display) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::internal(INTERNAL_MESSAGE)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "message": self.message,
            "status": self.status.as_u16(),
        });
        if let Some(fields) = self.fields {
            error["fields"] = fields;
        }

        (self.status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<UserAdminError> for AppError {
    fn from(err: UserAdminError) -> Self {
        match err {
            UserAdminError::Validation(errors) => Self::validation(&errors),
            UserAdminError::NotFound(_) => Self::not_found(err.to_string()),
            UserAdminError::DuplicateUserName => {
                Self::conflict(err.to_string()).with_field("user_name")
            }
            UserAdminError::HasRelatedRecords => Self::conflict(err.to_string()),
            UserAdminError::AccountNotFound(_) => Self::not_found(err.to_string()),
            UserAdminError::PasswordHash(_)
            | UserAdminError::Photo(_)
            | UserAdminError::Profile(_)
            | UserAdminError::Identity(_) => Self::unexpected(err),
        }
    }
}

impl From<ProfileRepositoryError> for AppError {
    fn from(err: ProfileRepositoryError) -> Self {
        UserAdminError::from(err).into()
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        Self::unexpected(err)
    }
}

impl From<MembershipError> for AppError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::GroupNotFound(_)
            | MembershipError::VotingNotFound(_)
            | MembershipError::UserNotFound(_) => Self::not_found(err.to_string()),
            MembershipError::AlreadyLinked => Self::conflict(err.to_string()),
            MembershipError::QueryError(_) => Self::unexpected(err),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_not_disclosed() {
        let err: AppError =
            ProfileRepositoryError::QueryError("relation \"users\" does not exist".into())
                .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn duplicate_user_name_is_a_form_error() {
        let err: AppError = UserAdminError::DuplicateUserName.into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.message, "The email is already used by another user");
        let fields = err.fields.expect("form error attached");
        assert_eq!(fields[0]["field"], "user_name");
    }

    #[test]
    fn validation_lists_every_field() {
        let mut errors = ValidationErrors::default();
        errors.push("first_name", "The first name field is required");
        errors.push("phone", "The phone field is required");
        let err = AppError::validation(&errors);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.fields.unwrap().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn membership_errors_map_to_statuses() {
        let missing: AppError = MembershipError::UserNotFound(3).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        let linked: AppError = MembershipError::AlreadyLinked.into();
        assert_eq!(linked.status, StatusCode::CONFLICT);
    }
}

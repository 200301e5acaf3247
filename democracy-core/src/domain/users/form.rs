//! Submitted user form and its validation rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::profile::{NewUser, UserChanges};
use crate::domain::identity::password::validate_password;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email pattern")
});

pub const USER_NAME_MAX: usize = 100;
pub const NAME_MAX: usize = 50;
pub const PHONE_MAX: usize = 20;
pub const ADDRESS_MAX: usize = 100;
pub const CLASSIFICATION_MAX: usize = 20;

/// Raw values submitted from the create or edit form.
///
/// Empty optional fields are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    /// Initial password for the identity account (create only)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every failing field of a submitted form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validated create form: the profile to store and the account password.
#[derive(Debug, Clone)]
pub struct ValidatedCreate {
    pub user: NewUser,
    pub password: String,
}

impl UserForm {
    /// Validate a create submission. The photo path is left unset and filled
    /// in once the upload is stored.
    pub fn validate_create(&self) -> Result<ValidatedCreate, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let user_name = normalize_user_name(&self.user_name);
        if user_name.is_empty() {
            errors.push("user_name", "The e-mail field is required");
        } else if user_name.chars().count() > USER_NAME_MAX {
            errors.push(
                "user_name",
                format!("The e-mail must be at most {USER_NAME_MAX} characters"),
            );
        } else if !EMAIL_PATTERN.is_match(&user_name) {
            errors.push("user_name", "The e-mail field is not a valid address");
        }

        let password = self.password.clone().unwrap_or_default();
        if password.is_empty() {
            errors.push("password", "The password field is required");
        } else if let Err(message) = validate_password(&password) {
            errors.push("password", message);
        }

        let fields = self.check_profile_fields(&mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedCreate {
            user: NewUser {
                user_name,
                first_name: fields.first_name,
                last_name: fields.last_name,
                phone: fields.phone,
                address: fields.address,
                grade: fields.grade,
                group: fields.group,
                photo: None,
            },
            password,
        })
    }

    /// Validate an edit submission. The submitted user name is ignored.
    pub fn validate_edit(&self) -> Result<UserChanges, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fields = self.check_profile_fields(&mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(UserChanges {
            first_name: fields.first_name,
            last_name: fields.last_name,
            phone: fields.phone,
            address: fields.address,
            grade: fields.grade,
            group: fields.group,
            photo: None,
        })
    }

    fn check_profile_fields(&self, errors: &mut ValidationErrors) -> ProfileFields {
        let first_name = required(errors, "first_name", "first name", &self.first_name, NAME_MAX);
        let last_name = required(errors, "last_name", "last name", &self.last_name, NAME_MAX);
        let phone = required(errors, "phone", "phone", &self.phone, PHONE_MAX);
        let address = required(errors, "address", "address", &self.address, ADDRESS_MAX);
        let grade = optional(errors, "grade", "grade", self.grade.as_deref());
        let group = optional(errors, "group", "group", self.group.as_deref());

        ProfileFields {
            first_name,
            last_name,
            phone,
            address,
            grade,
            group,
        }
    }
}

struct ProfileFields {
    first_name: String,
    last_name: String,
    phone: String,
    address: String,
    grade: Option<String>,
    group: Option<String>,
}

/// Trim and lowercase a user name so lookups in both stores agree.
pub fn normalize_user_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn required(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, format!("The {label} field is required"));
    } else if value.chars().count() > max {
        errors.push(
            field,
            format!("The {label} must be at most {max} characters"),
        );
    }
    value.to_string()
}

fn optional(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: Option<&str>,
) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if value.chars().count() > CLASSIFICATION_MAX {
        errors.push(
            field,
            format!("The {label} must be at most {CLASSIFICATION_MAX} characters"),
        );
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> UserForm {
        UserForm {
            user_name: "  Voter@Example.org ".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            phone: "555-0100".into(),
            address: "12 Elm Street".into(),
            grade: Some("11".into()),
            group: Some("".into()),
            password: Some("secret1".into()),
        }
    }

    #[test]
    fn create_normalizes_user_name_and_drops_empty_optionals() {
        let validated = valid_form().validate_create().unwrap();
        assert_eq!(validated.user.user_name, "voter@example.org");
        assert_eq!(validated.user.grade.as_deref(), Some("11"));
        assert_eq!(validated.user.group, None);
        assert_eq!(validated.password, "secret1");
    }

    #[test]
    fn create_reports_every_missing_field() {
        let errors = UserForm::default().validate_create().unwrap_err();
        for field in ["user_name", "password", "first_name", "last_name", "phone", "address"] {
            assert!(errors.has(field), "missing error for {field}");
        }
        assert!(!errors.has("grade"));
    }

    #[test]
    fn create_rejects_non_email_user_name() {
        let mut form = valid_form();
        form.user_name = "not-an-email".into();
        let errors = form.validate_create().unwrap_err();
        assert!(errors.has("user_name"));
        assert_eq!(errors.errors.len(), 1);
    }

    #[test]
    fn overlong_fields_are_rejected() {
        let mut form = valid_form();
        form.first_name = "x".repeat(NAME_MAX + 1);
        form.grade = Some("g".repeat(CLASSIFICATION_MAX + 1));
        let errors = form.validate_create().unwrap_err();
        assert!(errors.has("first_name"));
        assert!(errors.has("grade"));
    }

    #[test]
    fn edit_ignores_user_name_and_password() {
        let mut form = valid_form();
        form.user_name = String::new();
        form.password = None;
        let changes = form.validate_edit().unwrap();
        assert_eq!(changes.first_name, "Jane");
        assert_eq!(changes.photo, None);
    }

    #[test]
    fn user_name_limit_counts_characters() {
        let mut form = valid_form();
        // 87 characters, 167 bytes
        form.user_name = format!("{}@ex.org", "é".repeat(80));
        let validated = form.validate_create().unwrap();
        assert_eq!(validated.user.photo, None);

        form.user_name = format!("{}@ex.org", "é".repeat(USER_NAME_MAX));
        let errors = form.validate_create().unwrap_err();
        assert!(errors.has("user_name"));
    }

    #[test]
    fn display_joins_field_messages() {
        let mut errors = ValidationErrors::default();
        errors.push("phone", "The phone field is required");
        errors.push("address", "The address field is required");
        assert_eq!(
            errors.to_string(),
            "phone: The phone field is required; address: The address field is required"
        );
    }
}

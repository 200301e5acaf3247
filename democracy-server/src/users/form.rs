//! `multipart/form-data` decoding for the create and edit endpoints.

use axum::extract::{Multipart, multipart::MultipartError};
use tracing::debug;

use democracy_core::{domain::users::UserForm, photos::PhotoUpload};

use crate::infra::errors::AppError;

pub const PHOTO_FIELD: &str = "photo";

/// Collect the text fields into a [`UserForm`] and the optional photo.
///
/// A file part without content counts as "no photo", which is what browsers
/// send when the file input is left empty.
pub async fn read_user_form(
    mut multipart: Multipart,
) -> Result<(UserForm, Option<PhotoUpload>), AppError> {
    let mut form = UserForm::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == PHOTO_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if bytes.is_empty() {
                continue;
            }
            photo = Some(PhotoUpload {
                file_name,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "user_name" => form.user_name = value,
            "first_name" => form.first_name = value,
            "last_name" => form.last_name = value,
            "phone" => form.phone = value,
            "address" => form.address = value,
            "grade" => form.grade = Some(value),
            "group" => form.group = Some(value),
            "password" => form.password = Some(value),
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok((form, photo))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use serde_json::{Value, json};
use tempfile::TempDir;

use democracy_core::{
    Role,
    api::v1,
    domain::identity::{NewAccount, password::hash_password},
};
use democracy_server::{
    AppState, create_app,
    infra::{
        config::{
            AuthConfig, Config, ConfigMetadata, DatabaseConfig, ServerConfig, StorageConfig,
        },
        startup::{Stores, build_state},
    },
};

pub const ADMIN_USER: &str = "admin@example.org";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const MAX_PHOTO_BYTES: usize = 256 * 1024;

pub const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _tempdir: TempDir,
}

impl TestApp {
    pub fn into_parts(self) -> (Router, AppState, TempDir) {
        (self.router, self.state, self._tempdir)
    }
}

pub fn test_config(tempdir: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        storage: StorageConfig {
            photos_dir: tempdir.path().join("photos"),
            max_photo_bytes: MAX_PHOTO_BYTES,
        },
        auth: AuthConfig {
            session_ttl: Duration::from_secs(3600),
            bootstrap_admin_user: None,
            bootstrap_admin_password: None,
        },
        dev_mode: true,
        metadata: ConfigMetadata::default(),
    }
}

pub async fn build_test_app() -> Result<TestApp> {
    let tempdir = tempfile::tempdir().context("failed to create temporary directory")?;
    let config = test_config(&tempdir);
    std::fs::create_dir_all(&config.storage.photos_dir)
        .context("failed to create photo directory")?;

    let state = build_state(Arc::new(config), Stores::in_memory());
    let router = create_app(state.clone());

    Ok(TestApp {
        router,
        state,
        _tempdir: tempdir,
    })
}

/// Test server plus the state behind it and a signed-in admin token.
pub struct Harness {
    pub server: TestServer,
    pub state: AppState,
    pub admin_token: String,
    _tempdir: TempDir,
}

pub async fn start() -> Result<Harness> {
    let (router, state, tempdir) = build_test_app().await?.into_parts();
    let server = TestServer::new(router).map_err(|err| anyhow!(err.to_string()))?;

    seed_account(&state, ADMIN_USER, ADMIN_PASSWORD, &[Role::Admin, Role::User]).await?;
    let admin_token = login(&server, ADMIN_USER, ADMIN_PASSWORD).await?;

    Ok(Harness {
        server,
        state,
        admin_token,
        _tempdir: tempdir,
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Create an identity account directly in the store.
pub async fn seed_account(
    state: &AppState,
    user_name: &str,
    password: &str,
    roles: &[Role],
) -> Result<()> {
    let identity = state.identity();
    let account = identity
        .create_account(NewAccount {
            user_name: user_name.to_string(),
            email: user_name.to_string(),
            phone_number: None,
            password_hash: hash_password(password).map_err(|e| anyhow!(e.to_string()))?,
        })
        .await?;

    for role in roles {
        if !identity.role_exists(role.as_str()).await? {
            identity.create_role(role.as_str()).await?;
        }
        identity.add_to_role(account.id, role.as_str()).await?;
    }
    Ok(())
}

pub async fn login(server: &TestServer, user_name: &str, password: &str) -> Result<String> {
    let response = server
        .post(v1::auth::LOGIN)
        .json(&json!({ "user_name": user_name, "password": password }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("login response carries a token")
}

/// A complete create form for `user_name`.
pub fn user_form(user_name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("user_name", user_name)
        .add_text("first_name", "Jane")
        .add_text("last_name", "Doe")
        .add_text("phone", "555-0100")
        .add_text("address", "12 Elm Street")
        .add_text("grade", "11")
        .add_text("group", "B")
        .add_text("password", "voter-pass")
}

pub fn png_part(file_name: &str) -> Part {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.extend_from_slice(&[0u8; 32]);
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_type("image/png")
}

/// Create a profile through the API and return its id.
pub async fn create_user(harness: &Harness, user_name: &str) -> Result<i64> {
    let response = harness
        .server
        .post(v1::users::COLLECTION)
        .add_header("Authorization", bearer(&harness.admin_token))
        .multipart(user_form(user_name))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["data"]["user_id"]
        .as_i64()
        .context("created user carries an id")
}

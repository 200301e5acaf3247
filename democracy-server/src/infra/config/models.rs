use std::{fmt, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    /// Allows running without PostgreSQL on in-memory stores
    pub dev_mode: bool,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub photos_dir: PathBuf,
    pub max_photo_bytes: usize,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub session_ttl: Duration,
    /// Account created with the `Admin` role when no admin exists yet
    pub bootstrap_admin_user: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_ttl", &self.session_ttl)
            .field("bootstrap_admin_user", &self.bootstrap_admin_user)
            .field(
                "bootstrap_admin_password",
                &self.bootstrap_admin_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl AuthConfig {
    /// Both bootstrap credentials, when configured.
    pub fn bootstrap_credentials(&self) -> Option<(&str, &str)> {
        match (&self.bootstrap_admin_user, &self.bootstrap_admin_password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

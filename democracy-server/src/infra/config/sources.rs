use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_photo_bytes: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    /// Human readable duration, e.g. `12h` or `30m`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin_password: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub photos_dir: Option<PathBuf>,
    pub max_photo_bytes: Option<usize>,
    pub session_ttl: Option<String>,
    pub bootstrap_admin_user: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    pub dev_mode: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: var("DEMOCRACY_CONFIG").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT").and_then(|s| s.parse().ok()),
            database_url: var("DATABASE_URL"),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok()),
            photos_dir: var("PHOTOS_DIR").map(PathBuf::from),
            max_photo_bytes: var("MAX_PHOTO_BYTES").and_then(|s| s.parse().ok()),
            session_ttl: var("SESSION_TTL"),
            bootstrap_admin_user: var("BOOTSTRAP_ADMIN_USER"),
            bootstrap_admin_password: var("BOOTSTRAP_ADMIN_PASSWORD"),
            dev_mode: var("DEV_MODE").and_then(|s| parse_bool(&s)),
        }
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_sections_are_optional() {
        let parsed: FileConfig = toml::from_str(
            r#"
            dev_mode = true

            [storage]
            photos_dir = "/var/lib/democracy/photos"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.dev_mode, Some(true));
        assert_eq!(
            parsed.storage.photos_dir,
            Some(PathBuf::from("/var/lib/democracy/photos"))
        );
        assert!(parsed.server.port.is_none());
        assert!(parsed.auth.session_ttl.is_none());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}

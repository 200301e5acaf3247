use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use democracy_core::photos::DEFAULT_MAX_PHOTO_BYTES;

use super::{
    models::{
        AuthConfig, Config, ConfigMetadata, DatabaseConfig, ServerConfig, StorageConfig,
    },
    sources::{EnvConfig, FileConfig},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("democracy.toml"),
        PathBuf::from("config/democracy.toml"),
    ]
});

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let env_config = EnvConfig::gather();
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let metadata = ConfigMetadata {
            config_path,
            env_file_loaded,
        };
        compose_config(file_config, env_config, metadata)
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        // An explicitly named file must exist; default locations are optional.
        let (path, explicit) = match (&self.options.config_path, &env_config.config_path) {
            (Some(path), _) | (None, Some(path)) => (Some(path.clone()), true),
            (None, None) => (
                DEFAULT_CONFIG_LOCATIONS
                    .iter()
                    .find(|candidate| candidate.exists())
                    .cloned(),
                false,
            ),
        };

        let Some(path) = path else {
            return Ok((None, None));
        };
        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge file and environment values over the defaults. Environment wins.
pub fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No democracy.toml detected; using environment variables and defaults",
            "Create democracy.toml or set DEMOCRACY_CONFIG to point at one",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        storage: file_storage,
        auth: file_auth,
        dev_mode: file_dev_mode,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(3000),
    };

    let database = DatabaseConfig {
        url: env
            .database_url
            .or(file_database.url)
            .filter(|url| !url.trim().is_empty()),
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };

    let max_photo_bytes = env
        .max_photo_bytes
        .or(file_storage.max_photo_bytes)
        .unwrap_or(DEFAULT_MAX_PHOTO_BYTES);
    if max_photo_bytes == 0 {
        return Err(ConfigLoadError::InvalidValue {
            field: "storage.max_photo_bytes",
            reason: "must be greater than zero".to_string(),
        });
    }
    let storage = StorageConfig {
        photos_dir: env
            .photos_dir
            .or(file_storage.photos_dir)
            .unwrap_or_else(|| PathBuf::from("./data/photos")),
        max_photo_bytes,
    };

    let session_ttl = match env.session_ttl.or(file_auth.session_ttl) {
        Some(raw) => humantime::parse_duration(raw.trim()).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field: "auth.session_ttl",
                value: raw.clone(),
                source,
            }
        })?,
        None => DEFAULT_SESSION_TTL,
    };
    if session_ttl.is_zero() {
        return Err(ConfigLoadError::InvalidValue {
            field: "auth.session_ttl",
            reason: "must be greater than zero".to_string(),
        });
    }

    let auth = AuthConfig {
        session_ttl,
        bootstrap_admin_user: env.bootstrap_admin_user.or(file_auth.bootstrap_admin_user),
        bootstrap_admin_password: env
            .bootstrap_admin_password
            .or(file_auth.bootstrap_admin_password),
    };
    if auth.bootstrap_admin_user.is_some() != auth.bootstrap_admin_password.is_some() {
        warnings.push_with_hint(
            "Only one of the bootstrap admin credentials is set; bootstrap is disabled",
            "Set both BOOTSTRAP_ADMIN_USER and BOOTSTRAP_ADMIN_PASSWORD",
        );
    }

    let dev_mode = env.dev_mode.or(file_dev_mode).unwrap_or(false);

    if database.url.is_none() {
        if !dev_mode {
            return Err(ConfigLoadError::MissingDatabaseUrl);
        }
        warnings.push_with_hint(
            "DATABASE_URL not configured; dev mode keeps all data in memory",
            "Set DATABASE_URL to persist users across restarts",
        );
    }

    let config = Config {
        server,
        database,
        storage,
        auth,
        dev_mode,
        metadata,
    };

    Ok(ConfigLoad { config, warnings })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("DATABASE_URL must be set unless DEV_MODE is enabled")]
    MissingDatabaseUrl,
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dev_env() -> EnvConfig {
        EnvConfig {
            dev_mode: Some(true),
            ..EnvConfig::default()
        }
    }

    #[test]
    fn defaults_apply_in_dev_mode() {
        let ConfigLoad { config, warnings } =
            compose_config(None, dev_env(), ConfigMetadata::default()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.max_photo_bytes, DEFAULT_MAX_PHOTO_BYTES);
        assert_eq!(config.auth.session_ttl, DEFAULT_SESSION_TTL);
        assert!(config.database.url.is_none());
        assert!(
            warnings
                .items
                .iter()
                .any(|w| w.message.contains("DATABASE_URL"))
        );
    }

    #[test]
    fn missing_database_url_outside_dev_mode_fails() {
        let err = compose_config(None, EnvConfig::default(), ConfigMetadata::default())
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingDatabaseUrl));
    }

    #[test]
    fn environment_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            [server]
            port = 8080
            host = "127.0.0.1"

            [database]
            url = "postgres://file/db"

            [auth]
            session_ttl = "30m"
            "#,
        )
        .unwrap();
        let env = EnvConfig {
            server_port: Some(9090),
            session_ttl: Some("2h".into()),
            ..EnvConfig::default()
        };

        let ConfigLoad { config, .. } =
            compose_config(Some(file), env, ConfigMetadata::default()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.url.as_deref(), Some("postgres://file/db"));
        assert_eq!(config.auth.session_ttl, Duration::from_secs(2 * 60 * 60));
    }

    #[test]
    fn bad_duration_is_reported() {
        let env = EnvConfig {
            session_ttl: Some("soon".into()),
            ..dev_env()
        };
        let err = compose_config(None, env, ConfigMetadata::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidDuration {
                field: "auth.session_ttl",
                ..
            }
        ));
    }

    #[test]
    fn half_configured_bootstrap_warns() {
        let env = EnvConfig {
            bootstrap_admin_user: Some("admin@example.org".into()),
            ..dev_env()
        };
        let ConfigLoad { config, warnings } =
            compose_config(None, env, ConfigMetadata::default()).unwrap();
        assert!(config.auth.bootstrap_credentials().is_none());
        assert!(warnings.items.iter().any(|w| w.message.contains("bootstrap")));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let loader = ConfigLoader::new().with_config_path("/definitely/not/here.toml");
        let err = loader.load_file_config(&EnvConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn explicit_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dev_mode = true\n[storage]\nmax_photo_bytes = 1024").unwrap();

        let loader = ConfigLoader::new().with_config_path(file.path());
        let (parsed, path) = loader.load_file_config(&EnvConfig::default()).unwrap();
        assert_eq!(path.as_deref(), Some(file.path()));
        assert_eq!(parsed.unwrap().storage.max_photo_bytes, Some(1024));
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use technanas_core::FirestoreConfig;

/// Where a setting's value came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Firestore project id
    pub project_id: Option<String>,
    /// Web API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (e.g. the local emulator)
    pub base_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Returns true if a project id is set
    pub fn is_configured(&self) -> bool {
        self.project_id.is_some()
    }

    /// Firestore client settings, if the remote store is configured
    pub fn firestore(&self) -> Option<FirestoreConfig> {
        let project_id = self.project_id.as_ref()?;
        let mut config = FirestoreConfig::new(project_id.clone());
        config.api_key = self.api_key.clone();
        config.base_url = self.base_url.clone();
        config.timeout = Duration::from_secs(self.timeout_secs);
        Some(config)
    }
}

/// Resolved settings, each path tagged with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub database_path: ConfigValue<PathBuf>,
    pub session_path: ConfigValue<PathBuf>,
    /// The YAML file that was read, if one existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub remote: RemoteConfig,
}

/// On-disk shape of `config.yaml`. Every key is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    session_path: Option<PathBuf>,
    remote: Option<RemoteConfig>,
}

const ENV_DATABASE_PATH: &str = "TECHNANAS_DATABASE_PATH";
const ENV_SESSION_PATH: &str = "TECHNANAS_SESSION_PATH";
const ENV_FIRESTORE_PROJECT: &str = "TECHNANAS_FIRESTORE_PROJECT";
const ENV_FIRESTORE_API_KEY: &str = "TECHNANAS_FIRESTORE_API_KEY";
const ENV_FIRESTORE_URL: &str = "TECHNANAS_FIRESTORE_URL";

/// Paths in the file are relative to the file's own directory.
fn resolve(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path.parent().map(|p| p.join(&path)).unwrap_or(path)
    } else {
        path
    }
}

fn env_path(name: &str, current: &mut ConfigValue<PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *current = ConfigValue::new(PathBuf::from(value), ConfigSource::Environment);
    }
}

fn env_string(name: &str, current: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *current = Some(value);
    }
}

impl Config {
    /// Builds the configuration. Environment variables beat the YAML file,
    /// which beats the built-in defaults. A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();
        let mut config = Self {
            database_path: ConfigValue::new(data_dir.join("technanas.db"), ConfigSource::Default),
            session_path: ConfigValue::new(data_dir.join("session.json"), ConfigSource::Default),
            config_file: None,
            remote: RemoteConfig::default(),
        };

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Read(path.clone(), e))?;
            let file: ConfigFile =
                serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(path.clone(), e))?;

            if let Some(p) = file.database_path {
                config.database_path = ConfigValue::new(resolve(&path, p), ConfigSource::File);
            }
            if let Some(p) = file.session_path {
                config.session_path = ConfigValue::new(resolve(&path, p), ConfigSource::File);
            }
            if let Some(remote) = file.remote {
                config.remote = remote;
            }
            config.config_file = Some(path);
        }

        env_path(ENV_DATABASE_PATH, &mut config.database_path);
        env_path(ENV_SESSION_PATH, &mut config.session_path);
        env_string(ENV_FIRESTORE_PROJECT, &mut config.remote.project_id);
        env_string(ENV_FIRESTORE_API_KEY, &mut config.remote.api_key);
        env_string(ENV_FIRESTORE_URL, &mut config.remote.base_url);

        Ok(config)
    }

    /// `technanas` under the platform config dir (`~/.config` on Linux).
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("technanas")
    }

    /// `technanas` under the platform data dir (`~/.local/share` on Linux).
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("technanas")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => {
                write!(f, "Cannot read config file {}: {}", path.display(), e)
            }
            ConfigError::Parse(path, e) => {
                write!(f, "Invalid config file {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
        }
    }
}

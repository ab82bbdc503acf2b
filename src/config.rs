use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::http::MAX_RETRIES;
use crate::predict::{DEFAULT_HORIZON_HOURS, DEFAULT_STEP_HOURS, DEFAULT_SCAN_STEP_SECONDS};

pub const DEFAULT_CONFIG_FILE: &str = "sat-pass.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration '{value}': {message}")]
    Duration { value: String, message: String },
    #[error("http.retries is {0}, at most {max} allowed", max = MAX_RETRIES)]
    Retries(u32),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spacetrack: SpaceTrackConfig,
    pub geocoder: GeocoderConfig,
    pub http: HttpConfig,
    pub catalog: CatalogConfig,
    pub predict: PredictConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpaceTrackConfig {
    pub base_url: String,
    pub identity: Option<String>,
    pub password: Option<String>,
    pub credentials_file: PathBuf,
}

impl Default for SpaceTrackConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.space-track.org".to_string(),
            identity: None,
            password: None,
            credentials_file: PathBuf::from("credentials.yaml"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("sat-pass/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Humantime string, e.g. "30s".
    pub timeout: String,
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: "30s".to_string(),
            retries: MAX_RETRIES,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(self.timeout.trim()).map_err(|e| ConfigError::Duration {
            value: self.timeout.clone(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("satellitelist.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    pub horizon_hours: u32,
    pub step_hours: u32,
    pub altitude_m: Option<f64>,
    /// Coarse scan grid; passes shorter than this can be missed.
    pub scan_step_seconds: u32,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            horizon_hours: DEFAULT_HORIZON_HOURS,
            step_hours: DEFAULT_STEP_HOURS,
            altitude_m: None,
            scan_step_seconds: DEFAULT_SCAN_STEP_SECONDS,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.http.timeout()?;
        if config.http.retries > MAX_RETRIES {
            return Err(ConfigError::Retries(config.http.retries));
        }
        Ok(config)
    }

    /// Explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }
}

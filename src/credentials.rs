use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::SpaceTrackConfig;

pub const IDENTITY_ENV: &str = "SPACETRACK_IDENTITY";
pub const PASSWORD_ENV: &str = "SPACETRACK_PASSWORD";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no Space-Track credentials found; run `sat-pass login` or set SPACETRACK_IDENTITY/SPACETRACK_PASSWORD")]
    Missing,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub identity: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(identity: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identity: identity.into().trim().to_string(),
            password: password.into().trim_end_matches(['\r', '\n']).to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let content = fs::read_to_string(path)?;
        let stored: Credentials = serde_yaml::from_str(&content)?;
        Ok(Self::new(stored.identity, stored.password))
    }

    /// Write the credentials file, readable by the owner only on Unix.
    pub fn store(&self, path: &Path) -> Result<(), CredentialsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_yaml::to_string(self)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        log::info!("Stored Space-Track credentials in {}", path.display());
        Ok(())
    }

    /// Environment, then config file, then the stored credentials file.
    pub fn resolve(config: &SpaceTrackConfig) -> Result<Self, CredentialsError> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    fn resolve_with(
        config: &SpaceTrackConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialsError> {
        if let (Some(identity), Some(password)) = (env(IDENTITY_ENV), env(PASSWORD_ENV)) {
            log::debug!("Using Space-Track credentials from environment");
            return Ok(Self::new(identity, password));
        }
        if let (Some(identity), Some(password)) = (&config.identity, &config.password) {
            log::debug!("Using Space-Track credentials from config");
            return Ok(Self::new(identity.as_str(), password.as_str()));
        }
        if config.credentials_file.is_file() {
            log::debug!(
                "Using Space-Track credentials from {}",
                config.credentials_file.display()
            );
            return Self::from_file(&config.credentials_file);
        }
        Err(CredentialsError::Missing)
    }
}

//! Environment-based configuration for the registry tooling.

use anyhow::Result;
use std::path::PathBuf;

use crate::errors::ConfigError;

/// Location of the registry document
#[derive(Clone, Debug)]
pub struct RegistryPath(PathBuf);

/// Whether `watch` reloads the registry on SIGHUP
#[derive(Clone, Debug)]
pub struct ReloadOnHangup(bool);

/// Main application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub version: String,
    pub registry_path: RegistryPath,
    pub reload_on_hangup: ReloadOnHangup,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let registry_path: RegistryPath = default_env("REGISTRY_PATH", "registry.json").try_into()?;
        let reload_on_hangup: ReloadOnHangup =
            default_env("REGISTRY_RELOAD_ON_HANGUP", "true").try_into()?;

        Ok(Self {
            version: version()?,
            registry_path,
            reload_on_hangup,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    optional_env(name).unwrap_or_else(|| default_value.to_string())
}

impl TryFrom<String> for RegistryPath {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyPath("REGISTRY_PATH".to_string()).into());
        }
        Ok(Self(PathBuf::from(value)))
    }
}

impl AsRef<PathBuf> for RegistryPath {
    fn as_ref(&self) -> &PathBuf {
        &self.0
    }
}

impl TryFrom<String> for ReloadOnHangup {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for ReloadOnHangup {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}

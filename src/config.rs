use crate::error::ExporterError;
use crate::ups::paths::{DEFAULT_LOGIN_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings shared by every device scraper.
#[derive(Debug, Deserialize, Clone)]
pub struct ExporterConfig {
    /// Accept self-signed UPS certificates
    #[serde(default)]
    pub insecure: bool,
    /// Scrape all devices concurrently instead of one after another
    #[serde(default)]
    pub threading: bool,
    #[serde(default = "default_login_timeout")]
    pub login_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            insecure: false,
            threading: false,
            login_timeout_seconds: default_login_timeout(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9795
}

fn default_login_timeout() -> u64 {
    DEFAULT_LOGIN_TIMEOUT_SECS
}

fn default_request_timeout() -> u64 {
    REQUEST_TIMEOUT_SECS
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("EATON_UPS_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

/// Connection details for one UPS as written in the device map.
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    pub address: String,
    pub user: String,
    pub password: SecretString,
}

/// Ordered mapping of device name to connection details.
///
/// The JSON form is an object keyed by device name:
///
/// ```json
/// {
///   "ups-rack-a": {"address": "https://10.0.0.5", "user": "admin", "password": "secret"}
/// }
/// ```
///
/// Entries keep the order in which they appear in the document.
#[derive(Debug, Clone, Default)]
pub struct DeviceMap {
    entries: Vec<(String, DeviceConfig)>,
}

impl DeviceMap {
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Self::from_value(value).map_err(|e| match e {
            ExporterError::Config(reason) => {
                ExporterError::Config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    pub fn from_value(value: serde_json::Value) -> crate::error::Result<Self> {
        let serde_json::Value::Object(object) = value else {
            return Err(ExporterError::Config(
                "device map must be a JSON object keyed by device name".to_string(),
            ));
        };

        let mut entries = Vec::with_capacity(object.len());
        for (name, device) in object {
            let device: DeviceConfig = serde_json::from_value(device)
                .map_err(|e| ExporterError::Config(format!("device '{}': {}", name, e)))?;
            entries.push((name, device));
        }

        Ok(Self { entries })
    }

    pub fn push(&mut self, name: impl Into<String>, device: DeviceConfig) {
        self.entries.push((name.into(), device));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceConfig)> {
        self.entries.iter().map(|(name, device)| (name.as_str(), device))
    }
}

impl IntoIterator for DeviceMap {
    type Item = (String, DeviceConfig);
    type IntoIter = std::vec::IntoIter<(String, DeviceConfig)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

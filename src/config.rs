use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::{AdminLevel, MAX_LEVEL};

const DEFAULT_BOUNDARY_URL: &str = "http://localhost:3000";
const DEFAULT_GAPI_URL: &str = "http://localhost:8080/query";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub drill: DrillConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    /// Base URL of the boundary service (serves `/api/admin-areas`)
    #[serde(default = "default_boundary_url")]
    pub boundary_url: String,
    /// GraphQL endpoint answering `filterCoordinatesByBoundary`
    #[serde(default = "default_gapi_url")]
    pub gapi_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DrillConfig {
    #[serde(default = "default_max_level")]
    pub max_level: u8,
}

fn default_boundary_url() -> String {
    DEFAULT_BOUNDARY_URL.to_string()
}

fn default_gapi_url() -> String {
    DEFAULT_GAPI_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_level() -> u8 {
    MAX_LEVEL
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            boundary_url: default_boundary_url(),
            gapi_url: default_gapi_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            max_level: default_max_level(),
        }
    }
}

impl ServicesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DrillConfig {
    pub fn max_level(&self) -> AdminLevel {
        AdminLevel::clamped(self.max_level as i64)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid config file")?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.services.timeout_secs == 0 {
            anyhow::bail!("services.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Load from `path` if given, otherwise defaults; then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `GAPI_URL` and `BOUNDARY_URL` take precedence over the file
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GAPI_URL").filter(|u| !u.is_empty()) {
            self.services.gapi_url = url;
        }
        if let Some(url) = lookup("BOUNDARY_URL").filter(|u| !u.is_empty()) {
            self.services.boundary_url = url;
        }
    }
}

//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult};

/// Settings shared by the WMS and WFS clients.
///
/// ```yaml
/// version: "1.1.1"
/// timeout_secs: 30
/// sort_params: true
/// user_agent: "my-dashboard/1.0"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Version requested in GetCapabilities; the service default when unset
    pub version: Option<String>,

    /// Wait budget for each HTTP request; unbounded when unset
    pub timeout_secs: Option<u64>,

    /// Sort query parameters in generated URLs
    pub sort_params: bool,

    /// User-Agent header sent by the HTTP fetcher
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: None,
            timeout_secs: None,
            sort_params: true,
            user_agent: format!("ogc-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> OgcResult<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)
            .map_err(|e| OgcError::Config(format!("YAML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> OgcResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OgcError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> OgcResult<()> {
        if self.timeout_secs == Some(0) {
            return Err(OgcError::Config("timeout_secs must be greater than 0".into()));
        }
        if let Some(version) = &self.version {
            let valid = !version.is_empty()
                && version.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            if !valid {
                return Err(OgcError::Config(format!("invalid version '{}'", version)));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_sort_params(mut self, sort: bool) -> Self {
        self.sort_params = sort;
        self
    }

    /// Configured version, falling back to the service's default.
    pub(crate) fn version_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.version.as_deref().unwrap_or(default)
    }
}

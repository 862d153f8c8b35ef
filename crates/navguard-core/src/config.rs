//! Controller configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use navguard_filter::{SchemeExclusions, DEFAULT_EXCLUDED_SCHEMES, DEFAULT_NEW_TAB_MARKERS};

use crate::error::CoreError;
use crate::Result;

/// Landing page blocked tabs are sent to
pub const DEFAULT_REDIRECT_LOCATION: &str = "https://studentontask.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute URL blocked tabs are redirected to
    pub redirect_location: String,
    /// Active window poll period in milliseconds
    pub poll_interval_ms: u64,
    /// Schemes that bypass filtering
    pub excluded_schemes: Vec<String>,
    /// Substrings identifying the new tab page
    pub new_tab_markers: Vec<String>,
    /// Capacity of the notification bus
    pub bus_capacity: usize,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.redirect_host()?;
        if self.bus_capacity == 0 {
            return Err(CoreError::Config("bus_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Hostname of the redirect location
    pub fn redirect_host(&self) -> Result<String> {
        let url = Url::parse(&self.redirect_location).map_err(|e| {
            CoreError::Config(format!(
                "invalid redirect location {}: {}",
                self.redirect_location, e
            ))
        })?;

        url.host_str().map(|h| h.to_lowercase()).ok_or_else(|| {
            CoreError::Config(format!(
                "redirect location {} has no host",
                self.redirect_location
            ))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scheme_exclusions(&self) -> SchemeExclusions {
        SchemeExclusions::new(
            self.excluded_schemes.iter().cloned(),
            self.new_tab_markers.iter().cloned(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redirect_location: DEFAULT_REDIRECT_LOCATION.to_string(),
            poll_interval_ms: 1000,
            excluded_schemes: DEFAULT_EXCLUDED_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            new_tab_markers: DEFAULT_NEW_TAB_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            bus_capacity: 64,
        }
    }
}

use std::{collections::HashSet, path::Path};

use crate::error::{GridcastError, GridcastResult};

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// A named network video source.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Feed {
    pub name: String,
    pub url: String,
}

/// Parameters for the outbound WebRTC leg of the pipeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_stun_server")]
    pub stun_server: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            stun_server: default_stun_server(),
        }
    }
}

fn default_stun_server() -> String {
    DEFAULT_STUN_SERVER.to_string()
}

/// How the external worker process is launched and torn down.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WorkerSettings {
    /// Executable that receives the pipeline description as its argv.
    #[serde(default = "default_launcher")]
    pub launcher: String,

    /// Bound on the graceful-stop wait before the worker is killed.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

fn default_launcher() -> String {
    "gst-launch-1.0".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    5
}

/// External configuration, re-read on every control request.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AppConfig {
    pub feeds: Vec<Feed>,
    pub composite: Vec<String>,
    #[serde(default)]
    pub webrtc: TransportSettings,
    #[serde(default)]
    pub worker: WorkerSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> GridcastResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GridcastError::config(format!("failed to read '{}': {e}", path.display()))
        })?;
        let config: AppConfig = serde_yaml::from_str(&raw).map_err(|e| {
            GridcastError::config(format!("failed to parse '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GridcastResult<()> {
        let mut seen = HashSet::new();
        for feed in &self.feeds {
            if feed.name.trim().is_empty() {
                return Err(GridcastError::config("feed name must be non-empty"));
            }
            if feed.url.trim().is_empty() {
                return Err(GridcastError::config(format!(
                    "feed '{}' has an empty url",
                    feed.name
                )));
            }
            if !seen.insert(feed.name.as_str()) {
                // Catalog lookup is by name; a duplicate would silently shadow.
                return Err(GridcastError::config(format!(
                    "duplicate feed name '{}'",
                    feed.name
                )));
            }
        }
        Ok(())
    }
}

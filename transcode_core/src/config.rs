use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "transcode";
const APP_NAME: &str = "transcode_client";
const CONFIG_FILE: &str = "config.json";

/// Overrides the config directory (used by tests)
pub const CONFIG_DIR_ENV: &str = "TRANSCODE_TEST_CONFIG_DIR";
/// Overrides the server endpoint at runtime
pub const ENDPOINT_ENV: &str = "TRANSCODE_ENDPOINT";

/// Server address baked in at build time
const DEFAULT_SERVER_ADDR: &str = match option_env!("TRANSCODE_SERVER_ADDR") {
    Some(addr) => addr,
    None => "192.168.0.26:8080",
};

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// The transcode server's socket URL
pub fn default_endpoint() -> String {
    format!("ws://{}/ws", DEFAULT_SERVER_ADDR)
}

/// Where saved videos go unless the user picks another place
pub fn default_download_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| {
            dirs.download_dir()
                .map(|d| d.to_path_buf())
                .or_else(|| Some(dirs.home_dir().to_path_buf()))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub download_dir: PathBuf,
    pub connect_timeout_secs: u64,
    /// Open the socket as soon as the session starts
    pub connect_on_start: bool,
    /// Largest inbound frame accepted, in bytes. `None` accepts any size.
    pub max_message_size: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            download_dir: default_download_dir(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            connect_on_start: true,
            max_message_size: None,
        }
    }
}

impl ClientConfig {
    /// Get the config file path
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(test_path) = std::env::var(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(test_path).join(CONFIG_FILE));
        }

        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load config from disk (or defaults), then apply environment overrides.
    /// A `.env` file in the working directory is honoured.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        let config = match Self::get_config_path() {
            Some(path) => match fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                    Self::default()
                }),
                Err(_) => Self::default(),
            },
            None => Self::default(),
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the persisted snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "registrations.json";

/// File holding live entity states between runs.
pub const ENTITY_STATE_FILE: &str = "entity_states.json";

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs, skipping comments and blank lines.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            if !key.is_empty() {
                pairs.push((key, value));
            }
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every route is mounted under. Empty mounts at the root.
    pub base_path: String,
    /// Bearer token required on the registration endpoint. `None` disables the check.
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn entity_state_path(&self) -> PathBuf {
        self.data_dir.join(ENTITY_STATE_FILE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    /// How many times exposing the HTTP endpoint is attempted.
    pub expose_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_interval_ms: u64,
}

impl StartupConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                host: "0.0.0.0".to_string(),
                port: 8123,
                base_path: "/api/desktop_app".to_string(),
                access_token: None,
            },
            storage: StorageConfig {
                data_dir: dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("desktop-app-bridge"),
            },
            startup: StartupConfig {
                expose_attempts: 5,
                retry_interval_ms: 2000,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // HTTP configuration
        if let Ok(host) = std::env::var("BRIDGE_HOST") {
            config.http.host = host;
        }
        if let Ok(port) = std::env::var("BRIDGE_PORT")
            && let Ok(p) = port.parse()
        {
            config.http.port = p;
        }
        if let Ok(base_path) = std::env::var("BRIDGE_BASE_PATH") {
            config.http.base_path = base_path;
        }
        if let Ok(token) = std::env::var("BRIDGE_ACCESS_TOKEN")
            && !token.is_empty()
        {
            config.http.access_token = Some(token);
        }

        // Storage configuration
        if let Ok(dir) = std::env::var("BRIDGE_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        // Startup configuration
        if let Ok(attempts) = std::env::var("BRIDGE_EXPOSE_ATTEMPTS")
            && let Ok(a) = attempts.parse()
        {
            config.startup.expose_attempts = a;
        }
        if let Ok(interval) = std::env::var("BRIDGE_RETRY_INTERVAL_MS")
            && let Ok(i) = interval.parse()
        {
            config.startup.retry_interval_ms = i;
        }

        config
    }

    /// Normalized base path: leading slash, no trailing slash, empty for root.
    pub fn base_path(&self) -> String {
        let trimmed = self.http.base_path.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

// common/src/config.rs
use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Origin of the chat frontend's dev server
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";

/// Central configuration for the presence server
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String, // HS256 secret shared with the chat API
    pub jwt_cookie_name: String,
    pub log_level: String,
    /// Browser origins allowed to open `/ws` and call the presence API
    /// with the user's credentials.
    pub allowed_origins: Vec<String>,
    /// Outbound events a connection may have queued before sends to it are dropped.
    pub mailbox_capacity: usize,
    pub heartbeat: HeartbeatConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl HeartbeatConfig {
    // Never zero: a zero period panics the interval timer
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5001".to_string(),
            jwt_secret: "dev_secret".to_string(),
            jwt_cookie_name: "jwt".to_string(),
            log_level: "info".to_string(),
            allowed_origins: vec![DEFAULT_CLIENT_URL.to_string()],
            mailbox_capacity: 256,
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        let config: Self = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. APP__HEARTBEAT__TIMEOUT_SECS=60, APP__ALLOWED_ORIGINS=a,b
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config.with_client_url(env::var("CLIENT_URL").ok()))
    }

    /// Also allow the deployed frontend's origin (`CLIENT_URL`).
    pub fn with_client_url(mut self, client_url: Option<String>) -> Self {
        if let Some(url) = client_url {
            let url = url.trim().trim_end_matches('/').to_string();
            if !url.is_empty() && !self.allowed_origins.contains(&url) {
                self.allowed_origins.push(url);
            }
        }
        self
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    /// Configuration from plain environment variables (`SERVER_ADDR`,
    /// `JWT_SECRET`, ...), used when the layered load fails.
    pub fn from_plain_env() -> Self {
        let defaults = Self::default();

        let server_addr = env::var("SERVER_ADDR").unwrap_or(defaults.server_addr);
        let jwt_secret = env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret);
        let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or(defaults.jwt_cookie_name);
        let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.allowed_origins);

        let mailbox_capacity = env::var("MAILBOX_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.mailbox_capacity);

        let interval_secs = env::var("HEARTBEAT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.heartbeat.interval_secs);

        let timeout_secs = env::var("HEARTBEAT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.heartbeat.timeout_secs);

        Self {
            server_addr,
            jwt_secret,
            jwt_cookie_name,
            log_level,
            allowed_origins,
            mailbox_capacity,
            heartbeat: HeartbeatConfig {
                interval_secs,
                timeout_secs,
            },
        }
        .with_client_url(env::var("CLIENT_URL").ok())
    }
}

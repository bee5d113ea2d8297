use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub reachability: ReachabilityConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityConfig {
    /// `host:port` that must accept a TCP connection for the network to count as usable.
    pub probe_host: String,
    pub probe_interval_secs: u64,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
    /// Retry count at which a queued action is surfaced for manual review.
    pub attention_retry_threshold: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
            },
            api: ApiConfig {
                base_url: "https://api.petsafety.example/v1".to_string(),
                request_timeout_secs: 30,
            },
            reachability: ReachabilityConfig {
                probe_host: "api.petsafety.example:443".to_string(),
                probe_interval_secs: 15,
                probe_timeout_ms: 3000,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval_secs: 300, // 5 minutes
                attention_retry_threshold: 3,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PETSAFETY_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_parsed::<u32>("PETSAFETY_DB_MAX_CONNECTIONS") {
            cfg.database.max_connections = value.max(1);
        }

        if let Ok(v) = std::env::var("PETSAFETY_API_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.api.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Some(value) = env_parsed::<u64>("PETSAFETY_API_TIMEOUT_SECS") {
            cfg.api.request_timeout_secs = value.max(1);
        }

        if let Ok(v) = std::env::var("PETSAFETY_PROBE_HOST") {
            if !v.trim().is_empty() {
                cfg.reachability.probe_host = v.trim().to_string();
            }
        }
        if let Some(value) = env_parsed::<u64>("PETSAFETY_PROBE_INTERVAL_SECS") {
            cfg.reachability.probe_interval_secs = value.max(1);
        }
        if let Some(value) = env_parsed::<u64>("PETSAFETY_PROBE_TIMEOUT_MS") {
            cfg.reachability.probe_timeout_ms = value.max(100);
        }

        if let Ok(v) = std::env::var("PETSAFETY_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_parsed::<u64>("PETSAFETY_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval_secs = value.max(1);
        }
        if let Some(value) = env_parsed::<u32>("PETSAFETY_ATTENTION_RETRY_THRESHOLD") {
            cfg.sync.attention_retry_threshold = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(format!(
                "API base_url must be an http(s) URL: {}",
                self.api.base_url
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err("API request_timeout_secs must be greater than 0".to_string());
        }
        if !self.reachability.probe_host.contains(':') {
            return Err("Reachability probe_host must be in host:port form".to_string());
        }
        if self.reachability.probe_interval_secs == 0 {
            return Err("Reachability probe_interval_secs must be greater than 0".to_string());
        }
        if self.sync.auto_sync && self.sync.sync_interval_secs == 0 {
            return Err("Sync sync_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("petsafety");
    format!("sqlite://{}?mode=rwc", dir.join("offline.db").display())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

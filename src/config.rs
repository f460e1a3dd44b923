use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub steam: SteamConfig,

    pub scheduler: SchedulerConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,
    pub log_level: String,
    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
    pub max_db_connections: u32,
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/steamboat.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Header carrying the local user id, set by the upstream auth gateway
    /// after the Discord session has been validated.
    pub user_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            user_header: "x-user-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    /// Steam Web API key. Overridden by `STEAM_API_KEY` when set.
    pub api_key: String,
    pub api_base_url: String,
    pub store_base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.steampowered.com".to_string(),
            store_base_url: "https://store.steampowered.com".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Six-field cron expression (seconds first) for the library sync job
    pub sync_games_cron: String,
    pub sync_prices_cron: String,
    /// Accounts reconciled in parallel by sync-all
    pub max_concurrent_syncs: usize,
    /// Run both jobs once right after startup
    pub run_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_games_cron: "0 */5 * * * *".to_string(),
            sync_prices_cron: "0 */15 * * * *".to_string(),
            max_concurrent_syncs: 3,
            run_on_startup: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "steamboat".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            steam: SteamConfig::default(),
            scheduler: SchedulerConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment values win over the file so secrets can stay out of it.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("STEAM_API_KEY")
            && !key.trim().is_empty()
        {
            self.steam.api_key = key.trim().to_string();
        }

        if let Ok(url) = std::env::var("STEAMBOAT_DATABASE_URL")
            && !url.is_empty()
        {
            self.general.database_path = url;
        }

        if let Ok(port) = std::env::var("STEAMBOAT_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("steamboat").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".steamboat").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.enabled {
            if self.steam.api_key.trim().is_empty() {
                anyhow::bail!("Steam API key must be set when the scheduler is enabled");
            }

            if self.scheduler.sync_games_cron.trim().is_empty()
                || self.scheduler.sync_prices_cron.trim().is_empty()
            {
                anyhow::bail!("Scheduler cron expressions cannot be empty");
            }
        }

        if self.scheduler.max_concurrent_syncs == 0 {
            anyhow::bail!("scheduler.max_concurrent_syncs must be > 0");
        }

        if self.server.user_header.trim().is_empty() {
            anyhow::bail!("server.user_header cannot be empty");
        }

        argon2::Params::new(
            self.security.argon2_memory_cost_kib,
            self.security.argon2_time_cost,
            self.security.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(())
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable that overrides `database.url`.
pub const DATABASE_URL_ENV: &str = "MARQUEE_DATABASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub security: SecurityConfig,

    pub mail: MailConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Number of tokio worker threads (default: 0)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            worker_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on the `token` cookie.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Upper bound on how long graceful shutdown waits for in-flight requests.
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 4000,
            cors_allowed_origins: vec!["*".to_string()],
            secure_cookies: true,
            shutdown_grace_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,

    pub min_connections: u32,

    /// Per-query timeout. A query exceeding it fails as a transient error.
    pub query_timeout_seconds: u64,
}

impl DatabaseConfig {
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/marquee.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            query_timeout_seconds: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 19456 = 19MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Lifetime of the token mailed after registration.
    pub activation_token_ttl_hours: i64,

    /// Lifetime of a login token.
    pub authentication_token_ttl_hours: i64,
}

/// Upper bound for either token lifetime (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

impl SecurityConfig {
    /// Out-of-range values saturate; `validate` rejects them before they get here.
    #[must_use]
    pub fn activation_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.activation_token_ttl_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    #[must_use]
    pub fn authentication_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.authentication_token_ttl_hours)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 19456,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            activation_token_ttl_hours: 3 * 24,
            authentication_token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MailTransport {
    /// Welcome mails are skipped.
    Disabled,

    /// Each mail is written as a file into `path`. Meant for development.
    File { path: String },

    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from_name: String,

    pub from_email: String,

    pub transport: MailTransport,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_name: "Marquee".to_string(),
            from_email: "no-reply@marquee.local".to_string(),
            transport: MailTransport::Disabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
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

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV)
            && !url.is_empty()
        {
            self.database.url = url;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("marquee").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".marquee").join("config.toml"));
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
        if self.database.url.is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }

        if self.database.query_timeout_seconds == 0 {
            anyhow::bail!("database.query_timeout_seconds must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!("database.min_connections cannot exceed max_connections");
        }

        for (name, hours) in [
            ("activation_token_ttl_hours", self.security.activation_token_ttl_hours),
            (
                "authentication_token_ttl_hours",
                self.security.authentication_token_ttl_hours,
            ),
        ] {
            if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
                anyhow::bail!("security.{name} must be between 1 and {MAX_TOKEN_TTL_HOURS}");
            }
        }

        argon2::Params::new(
            self.security.argon2_memory_cost_kib,
            self.security.argon2_time_cost,
            self.security.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("invalid Argon2 settings in [security]: {e}"))?;

        if let MailTransport::Smtp { host, .. } = &self.mail.transport
            && host.is_empty()
        {
            anyhow::bail!("SMTP host cannot be empty when the SMTP transport is selected");
        }

        Ok(())
    }
}

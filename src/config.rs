use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::tokens::{KNOWN_PLACEHOLDER_SECRETS, MIN_JWT_SECRET_BYTES};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub email: EmailConfig,

    pub scheduler: SchedulerConfig,

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

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/mexicapp.db".to_string(),
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
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Use the first `X-Forwarded-For` entry as the client IP.
    /// Only enable behind a reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign access and refresh tokens.
    pub jwt_secret: String,

    pub access_token_minutes: i64,

    pub refresh_token_hours: i64,

    pub email_verification_hours: i64,

    pub password_reset_minutes: i64,

    /// Base URL used to build the links sent by email.
    pub frontend_url: String,
}

impl AuthConfig {
    /// Random hex secret suitable for HS256 signing.
    #[must_use]
    pub fn generate_secret() -> String {
        let bytes: [u8; MIN_JWT_SECRET_BYTES] = rand::rng().random();
        hex::encode(bytes)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: 60,
            refresh_token_hours: 24,
            email_verification_hours: 24,
            password_reset_minutes: 60,
            frontend_url: "http://localhost:5173".to_string(),
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

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Failed-login counting and lockout policy.
    pub login_throttle: LoginThrottleConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            login_throttle: LoginThrottleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginThrottleConfig {
    /// Failed attempts allowed before the identifier is locked.
    pub max_attempts: u32,

    /// Lockout duration once max attempts is reached.
    pub lockout_minutes: i64,

    /// A counter idle for longer than this is reset.
    pub reset_after_minutes: i64,
}

impl Default for LoginThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_minutes: 15,
            reset_after_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Write outgoing mail to the log only.
    Log,
    /// POST outgoing mail as JSON to `endpoint`.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub provider: EmailProvider,

    pub endpoint: String,

    pub api_key: String,

    pub from_address: String,

    pub from_name: String,

    pub request_timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Log,
            endpoint: "https://api.brevo.com/v3/smtp/email".to_string(),
            api_key: String::new(),
            from_address: "noreply@mexicapp.com".to_string(),
            from_name: "Mexicapp".to_string(),
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Cron expression (with seconds) for the maintenance purge.
    pub purge_cron: String,

    /// Blacklist rows and one-time tokens are kept this long after expiry.
    pub retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            purge_cron: "0 0 3 * * *".to_string(),
            retention_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            email: EmailConfig::default(),
            scheduler: SchedulerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

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

    /// `DATABASE_URL`, `JWT_SECRET` and `FRONTEND_URL` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.trim().is_empty()
        {
            self.general.database_path = url;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET")
            && !secret.trim().is_empty()
        {
            self.auth.jwt_secret = secret;
        }
        if let Ok(frontend) = std::env::var("FRONTEND_URL")
            && !frontend.trim().is_empty()
        {
            self.auth.frontend_url = frontend;
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
            paths.push(config_dir.join("mexicapp").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mexicapp").join("config.toml"));
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
            let mut config = Self::default();
            config.auth.jwt_secret = AuthConfig::generate_secret();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let secret = self.auth.jwt_secret.trim();
        if secret.is_empty() {
            anyhow::bail!("auth.jwt_secret must be set (run init-config or export JWT_SECRET)");
        }
        if KNOWN_PLACEHOLDER_SECRETS
            .iter()
            .any(|placeholder| secret.eq_ignore_ascii_case(placeholder))
        {
            anyhow::bail!("auth.jwt_secret is a published placeholder, generate a real secret");
        }
        if secret.len() < MIN_JWT_SECRET_BYTES {
            anyhow::bail!("auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes");
        }

        if self.auth.access_token_minutes <= 0 || self.auth.refresh_token_hours <= 0 {
            anyhow::bail!("Token lifetimes must be > 0");
        }

        if self.auth.email_verification_hours <= 0 || self.auth.password_reset_minutes <= 0 {
            anyhow::bail!("One-time token lifetimes must be > 0");
        }

        if self.security.login_throttle.max_attempts == 0 {
            anyhow::bail!("security.login_throttle.max_attempts must be > 0");
        }

        if self.email.provider == EmailProvider::Http && self.email.endpoint.is_empty() {
            anyhow::bail!("email.endpoint cannot be empty when the http provider is selected");
        }

        url::Url::parse(&self.auth.frontend_url).context("Invalid auth.frontend_url")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.auth.refresh_token_hours, 24);
        assert_eq!(config.security.login_throttle.max_attempts, 5);
        assert_eq!(config.security.login_throttle.lockout_minutes, 15);
        assert_eq!(config.email.provider, EmailProvider::Log);
        assert!(config.auth.jwt_secret.is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generated_secret_validates() {
        let mut config = Config::default();
        config.auth.jwt_secret = AuthConfig::generate_secret();
        assert_eq!(config.auth.jwt_secret.len(), MIN_JWT_SECRET_BYTES * 2);
        assert!(config.validate().is_ok());
        assert_ne!(config.auth.jwt_secret, AuthConfig::generate_secret());
    }

    #[test]
    fn test_validate_rejects_placeholder_and_short_secrets() {
        let mut config = Config::default();
        config.auth.jwt_secret = "change-me-in-production".to_string();
        assert!(config.validate().is_err());

        config.auth.jwt_secret = "a".repeat(MIN_JWT_SECRET_BYTES - 1);
        assert!(config.validate().is_err());

        config.auth.jwt_secret = "a".repeat(MIN_JWT_SECRET_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[auth]"));
        assert!(toml_str.contains("[security.login_throttle]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [email]
            provider = "http"
            api_key = "xyz"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.email.provider, EmailProvider::Http);
        assert_eq!(config.auth.password_reset_minutes, 60);
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "  ".to_string();
        assert!(config.validate().is_err());
    }
}

//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/car-rental/config.toml`).
//! Every section and field is optional; missing values fall back to the
//! defaults below. A few secrets can also come from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::ExpirySettings;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::DEFAULT_DATABASE_URL;
use crate::infrastructure::gateway::MoyasarConfig;
use crate::infrastructure::DatabaseConfig;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "CAR_RENTAL_CONFIG";

/// `~/.config/car-rental/config.toml`, or `./config.toml` when the platform
/// has no config directory.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .map(|dir| dir.join("car-rental").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub business: BusinessConfig,
    pub payment: PaymentConfig,
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. `info` or `car_rental=debug,tower_http=info`
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let jwt = JwtConfig::default();
        Self {
            jwt_secret: jwt.secret,
            jwt_issuer: jwt.issuer,
        }
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// Fixed offset of the business timezone, e.g. `+03:00`
    pub utc_offset: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+03:00".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub api_base: String,
    pub secret_key: String,
    pub currency: String,
    pub callback_url: String,
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        let gateway = MoyasarConfig::default();
        Self {
            api_base: gateway.api_base,
            secret_key: gateway.secret_key,
            currency: gateway.currency,
            callback_url: gateway.callback_url,
            timeout_secs: gateway.timeout.as_secs(),
        }
    }
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"<redacted>")
            .field("currency", &self.currency)
            .field("callback_url", &self.callback_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub interval_secs: u64,
    /// Age after which an unpaid reservation is deleted
    pub grace_period_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        let defaults = ExpirySettings::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            grace_period_secs: defaults.grace_period.as_secs(),
        }
    }
}

impl AppConfig {
    /// Read the config file, or defaults when it does not exist, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
            Self::from_toml(&raw).map_err(|e| format!("Invalid {}: {}", path.display(), e))?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create {}: {}", parent.display(), e))?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, raw).map_err(|e| format!("Cannot write {}: {}", path.display(), e))
    }

    /// `DATABASE_URL`, `JWT_SECRET` and `MOYASAR_SECRET_KEY` win over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = non_empty("JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        if let Some(key) = non_empty("MOYASAR_SECRET_KEY") {
            self.payment.secret_key = key;
        }
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            ..Default::default()
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.security.jwt_secret.clone(),
            issuer: self.security.jwt_issuer.clone(),
            ..Default::default()
        }
    }

    pub fn moyasar_config(&self) -> MoyasarConfig {
        MoyasarConfig {
            api_base: self.payment.api_base.clone(),
            secret_key: self.payment.secret_key.clone(),
            currency: self.payment.currency.clone(),
            callback_url: self.payment.callback_url.clone(),
            timeout: Duration::from_secs(self.payment.timeout_secs),
        }
    }

    pub fn expiry_settings(&self) -> ExpirySettings {
        ExpirySettings {
            interval: Duration::from_secs(self.sweeper.interval_secs.max(1)),
            grace_period: Duration::from_secs(self.sweeper.grace_period_secs),
        }
    }
}

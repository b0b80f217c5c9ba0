//! Configuration module for folio.

use serde::Deserialize;
use std::path::Path;

use crate::{FolioError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Rows fetched per round-trip when a query pages internally.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_db_path() -> String {
    "data/folio.db".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            page_size: default_page_size(),
        }
    }
}

/// Object storage and delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Domain photos are served from (e.g. a CDN distribution).
    #[serde(default)]
    pub delivery_domain: String,
    /// Largest accepted photo upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_max_upload_bytes() -> u64 {
    25 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            delivery_domain: String::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Photo sampler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    /// Maximum number of listed objects examined per request.
    #[serde(default = "default_max_scan")]
    pub max_scan: u64,
    /// Number of photos returned when the caller gives no limit.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_max_scan() -> u64 {
    20_000
}

fn default_limit() -> usize {
    200
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_scan: default_max_scan(),
            default_limit: default_limit(),
        }
    }
}

/// Invite configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteConfig {
    /// Validity window in days when the operator gives none.
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: i64,
}

fn default_ttl_days() -> i64 {
    30
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
        }
    }
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Group whose members are operators.
    #[serde(default = "default_admin_group")]
    pub admin_group: String,
    /// Group principals join when they accept an invite.
    #[serde(default = "default_member_group")]
    pub member_group: String,
    /// Shared secret for verifying bearer identity tokens (HS256).
    #[serde(default)]
    pub jwt_secret: String,
}

fn default_admin_group() -> String {
    "admin".to_string()
}

fn default_member_group() -> String {
    "user".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            admin_group: default_admin_group(),
            member_group: default_member_group(),
            jwt_secret: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/folio.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Sampler configuration.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Invite configuration.
    #[serde(default)]
    pub invites: InviteConfig,
    /// Identity configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FolioError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| FolioError::Misconfigured(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FOLIO_DELIVERY_DOMAIN`: photo delivery domain
    /// - `FOLIO_JWT_SECRET`: identity token secret
    /// - `FOLIO_MAX_SCAN`: sampler scan ceiling
    /// - `FOLIO_DEFAULT_LIMIT`: default sample size
    pub fn apply_env_overrides(&mut self) {
        if let Ok(domain) = std::env::var("FOLIO_DELIVERY_DOMAIN") {
            if !domain.is_empty() {
                self.storage.delivery_domain = domain;
            }
        }

        if let Ok(secret) = std::env::var("FOLIO_JWT_SECRET") {
            if !secret.is_empty() {
                self.identity.jwt_secret = secret;
            }
        }

        // Unparseable numbers are ignored, keeping the file value
        if let Some(max_scan) = env_number::<u64>("FOLIO_MAX_SCAN") {
            self.sampler.max_scan = max_scan;
        }

        if let Some(limit) = env_number::<usize>("FOLIO_DEFAULT_LIMIT") {
            self.sampler.default_limit = limit;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns `Misconfigured` if:
    /// - the delivery domain is not set
    /// - the scan ceiling, default limit or page size is zero
    /// - the admin or member group name is empty
    pub fn validate(&self) -> Result<()> {
        if self.storage.delivery_domain.trim().is_empty() {
            return Err(FolioError::Misconfigured(
                "storage.delivery_domain is not set. \
                 Set it in config.toml or via FOLIO_DELIVERY_DOMAIN environment variable."
                    .to_string(),
            ));
        }
        if self.sampler.max_scan == 0 {
            return Err(FolioError::Misconfigured(
                "sampler.max_scan must be positive".to_string(),
            ));
        }
        if self.sampler.default_limit == 0 {
            return Err(FolioError::Misconfigured(
                "sampler.default_limit must be positive".to_string(),
            ));
        }
        if self.database.page_size == 0 {
            return Err(FolioError::Misconfigured(
                "database.page_size must be positive".to_string(),
            ));
        }
        if self.identity.admin_group.is_empty() || self.identity.member_group.is_empty() {
            return Err(FolioError::Misconfigured(
                "identity group names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

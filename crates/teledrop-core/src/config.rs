//! Configuration module
//!
//! This module provides configuration structures for the relay service: upstream
//! credentials, key-value store bindings, hotlink policy and upload limits.

use std::env;
use std::fmt;

use crate::constants::{MAX_UPLOAD_SIZE_BYTES, MEDIA_GROUP_MAX_ITEMS};
use crate::storage_types::KvBackend;

// Common constants
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const UPSTREAM_TIMEOUT_SECS: u64 = 60;
const UPSTREAM_MAX_RETRIES: u32 = 2;
const UPSTREAM_RETRY_BASE_MS: u64 = 600;
const CHUNK_TTL_SECS: u64 = 86_400;
const CHUNK_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Base configuration shared by every entry point
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Relay configuration
#[derive(Clone)]
pub struct RelayConfig {
    pub base: BaseConfig,
    // Upstream Bot API
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_base: String,
    pub upstream_timeout_secs: u64,
    pub upstream_max_retries: u32,
    pub upstream_retry_base_ms: u64,
    // Key-value namespaces
    pub kv_backend: KvBackend,
    pub chunk_store_path: Option<String>,
    pub metadata_store_path: Option<String>,
    pub chunk_ttl_secs: u64,
    /// Interval between orphaned chunk sweeps. 0 = disabled.
    pub chunk_sweep_interval_secs: u64,
    // Hotlink protection
    pub allowed_origins: Vec<String>,
    pub expect_referer: bool,
    pub public_origin: Option<String>,
    // Upload limits
    pub max_upload_size_bytes: u64,
    pub media_group_size: usize,
    // Shared credential for write routes
    pub auth_token: Option<String>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("base", &self.base)
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("upstream_max_retries", &self.upstream_max_retries)
            .field("upstream_retry_base_ms", &self.upstream_retry_base_ms)
            .field("kv_backend", &self.kv_backend)
            .field("chunk_store_path", &self.chunk_store_path)
            .field("metadata_store_path", &self.metadata_store_path)
            .field("chunk_ttl_secs", &self.chunk_ttl_secs)
            .field("chunk_sweep_interval_secs", &self.chunk_sweep_interval_secs)
            .field("allowed_origins", &self.allowed_origins)
            .field("expect_referer", &self.expect_referer)
            .field("public_origin", &self.public_origin)
            .field("max_upload_size_bytes", &self.max_upload_size_bytes)
            .field("media_group_size", &self.media_group_size)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RelayConfig>);

impl Config {
    fn as_relay(&self) -> &RelayConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment().to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = RelayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_relay().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_relay().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_relay().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_relay().base.environment
    }

    pub fn telegram_bot_token(&self) -> &str {
        &self.as_relay().telegram_bot_token
    }

    pub fn telegram_chat_id(&self) -> &str {
        &self.as_relay().telegram_chat_id
    }

    pub fn telegram_api_base(&self) -> &str {
        &self.as_relay().telegram_api_base
    }

    pub fn upstream_timeout_secs(&self) -> u64 {
        self.as_relay().upstream_timeout_secs
    }

    pub fn upstream_max_retries(&self) -> u32 {
        self.as_relay().upstream_max_retries
    }

    pub fn upstream_retry_base_ms(&self) -> u64 {
        self.as_relay().upstream_retry_base_ms
    }

    pub fn kv_backend(&self) -> KvBackend {
        self.as_relay().kv_backend
    }

    pub fn chunk_store_path(&self) -> Option<&str> {
        self.as_relay().chunk_store_path.as_deref()
    }

    pub fn metadata_store_path(&self) -> Option<&str> {
        self.as_relay().metadata_store_path.as_deref()
    }

    pub fn chunk_ttl_secs(&self) -> u64 {
        self.as_relay().chunk_ttl_secs
    }

    pub fn chunk_sweep_interval_secs(&self) -> u64 {
        self.as_relay().chunk_sweep_interval_secs
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.as_relay().allowed_origins
    }

    pub fn expect_referer(&self) -> bool {
        self.as_relay().expect_referer
    }

    pub fn public_origin(&self) -> Option<&str> {
        self.as_relay().public_origin.as_deref()
    }

    pub fn max_upload_size_bytes(&self) -> u64 {
        self.as_relay().max_upload_size_bytes
    }

    pub fn media_group_size(&self) -> usize {
        self.as_relay().media_group_size
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.as_relay().auth_token.as_deref()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse::<u16>()
            .unwrap_or(DEFAULT_PORT);

        let telegram_bot_token = non_empty_var("TG_BOT_TOKEN")
            .or_else(|| non_empty_var("TG_Bot_Token"))
            .ok_or_else(|| anyhow::anyhow!("TG_BOT_TOKEN environment variable not set"))?;
        let telegram_chat_id = non_empty_var("TG_CHAT_ID")
            .or_else(|| non_empty_var("TG_Chat_ID"))
            .ok_or_else(|| anyhow::anyhow!("TG_CHAT_ID environment variable not set"))?;
        let telegram_api_base = non_empty_var("TG_API_BASE")
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let upstream_timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| UPSTREAM_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(UPSTREAM_TIMEOUT_SECS);
        let upstream_max_retries = env::var("UPSTREAM_MAX_RETRIES")
            .unwrap_or_else(|_| UPSTREAM_MAX_RETRIES.to_string())
            .parse::<u32>()
            .unwrap_or(UPSTREAM_MAX_RETRIES);
        let upstream_retry_base_ms = env::var("UPSTREAM_RETRY_BASE_MS")
            .unwrap_or_else(|_| UPSTREAM_RETRY_BASE_MS.to_string())
            .parse::<u64>()
            .unwrap_or(UPSTREAM_RETRY_BASE_MS);

        let kv_backend = match non_empty_var("KV_BACKEND") {
            Some(value) => value.parse::<KvBackend>()?,
            None => KvBackend::Memory,
        };
        let chunk_store_path = non_empty_var("CHUNK_STORE_PATH");
        let metadata_store_path = non_empty_var("METADATA_STORE_PATH");
        let chunk_ttl_secs = env::var("CHUNK_TTL_SECS")
            .unwrap_or_else(|_| CHUNK_TTL_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(CHUNK_TTL_SECS);
        let chunk_sweep_interval_secs = env::var("CHUNK_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| CHUNK_SWEEP_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(CHUNK_SWEEP_INTERVAL_SECS);

        let allowed_origins = parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default());
        let expect_referer = non_empty_var("EXPECT_REFERER")
            .or_else(|| non_empty_var("ALLOWED_REFERER"))
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let public_origin =
            non_empty_var("PUBLIC_ORIGIN").map(|v| v.trim_end_matches('/').to_string());

        let default_max_mb = MAX_UPLOAD_SIZE_BYTES / 1024 / 1024;
        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| default_max_mb.to_string())
            .parse::<u64>()
            .unwrap_or(default_max_mb);
        let media_group_size = env::var("MEDIA_GROUP_SIZE")
            .unwrap_or_else(|_| MEDIA_GROUP_MAX_ITEMS.to_string())
            .parse::<usize>()
            .unwrap_or(MEDIA_GROUP_MAX_ITEMS);

        let auth_token = non_empty_var("AUTH_TOKEN");

        Ok(RelayConfig {
            base: BaseConfig {
                server_port,
                cors_origins,
                environment,
            },
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_base,
            upstream_timeout_secs,
            upstream_max_retries,
            upstream_retry_base_ms,
            kv_backend,
            chunk_store_path,
            metadata_store_path,
            chunk_ttl_secs,
            chunk_sweep_interval_secs,
            allowed_origins,
            expect_referer,
            public_origin,
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            media_group_size,
            auth_token,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("TG_BOT_TOKEN must not be empty"));
        }
        if self.telegram_chat_id.trim().is_empty() {
            return Err(anyhow::anyhow!("TG_CHAT_ID must not be empty"));
        }
        if !self.telegram_api_base.starts_with("http://")
            && !self.telegram_api_base.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "TG_API_BASE must be an http(s) URL, got '{}'",
                self.telegram_api_base
            ));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPSTREAM_TIMEOUT_SECS must be greater than 0"));
        }
        if self.upstream_retry_base_ms == 0 {
            return Err(anyhow::anyhow!("UPSTREAM_RETRY_BASE_MS must be greater than 0"));
        }
        if self.media_group_size < 2 || self.media_group_size > MEDIA_GROUP_MAX_ITEMS {
            return Err(anyhow::anyhow!(
                "MEDIA_GROUP_SIZE must be between 2 and {}, got {}",
                MEDIA_GROUP_MAX_ITEMS,
                self.media_group_size
            ));
        }
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }
        if self.max_upload_size_bytes > MAX_UPLOAD_SIZE_BYTES {
            return Err(anyhow::anyhow!(
                "MAX_UPLOAD_SIZE_MB cannot exceed the upstream limit of {} MB",
                MAX_UPLOAD_SIZE_BYTES / 1024 / 1024
            ));
        }
        if self.kv_backend == KvBackend::Local {
            if self.chunk_store_path.is_none() {
                return Err(anyhow::anyhow!(
                    "CHUNK_STORE_PATH is required when KV_BACKEND=local"
                ));
            }
            if self.metadata_store_path.is_none() {
                return Err(anyhow::anyhow!(
                    "METADATA_STORE_PATH is required when KV_BACKEND=local"
                ));
            }
            if self.chunk_store_path == self.metadata_store_path {
                return Err(anyhow::anyhow!(
                    "CHUNK_STORE_PATH and METADATA_STORE_PATH must be different directories"
                ));
            }
        }
        if let Some(origin) = &self.public_origin {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "PUBLIC_ORIGIN must be an http(s) origin, got '{}'",
                    origin
                ));
            }
        }
        if let Some(token) = &self.auth_token {
            if token.len() < 16 {
                return Err(anyhow::anyhow!(
                    "AUTH_TOKEN must be at least 16 characters long"
                ));
            }
        }
        Ok(())
    }
}

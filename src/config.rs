//! Configuration management for RecruitChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{RecruitChatError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for RecruitChat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted database (PostgREST) connection settings
    #[serde(default)]
    pub supabase: SupabaseConfig,

    /// Webhook that produces assistant replies
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Message store behavior
    #[serde(default)]
    pub store: StoreConfig,

    /// Background refresh settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Favorites behavior
    #[serde(default)]
    pub favorites: FavoritesConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supabase / PostgREST configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    #[serde(default = "default_supabase_url")]
    pub url: String,

    /// Public (anon) API key sent as the `apikey` header
    #[serde(default)]
    pub api_key: String,

    /// Signed-in user's access token; falls back to `api_key` when unset
    #[serde(default)]
    pub access_token: Option<String>,

    /// Recruiter id that owns favorites and job postings
    #[serde(default)]
    pub recruiter_id: String,

    /// Table holding the chat message log
    #[serde(default = "default_messages_table")]
    pub messages_table: String,

    /// Table holding favorited candidates
    #[serde(default = "default_favorites_table")]
    pub favorites_table: String,

    /// Table holding job postings
    #[serde(default = "default_postings_table")]
    pub postings_table: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_supabase_timeout")]
    pub timeout_seconds: u64,

    /// Retry policy for store writes and reads
    #[serde(default = "default_store_retry")]
    pub retry: RetryPolicy,
}

fn default_supabase_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_messages_table() -> String {
    "n8n_chat_histories".to_string()
}

fn default_favorites_table() -> String {
    "chat_favoritos".to_string()
}

fn default_postings_table() -> String {
    "vagas".to_string()
}

fn default_supabase_timeout() -> u64 {
    15
}

fn default_store_retry() -> RetryPolicy {
    RetryPolicy::with_retries(2)
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: default_supabase_url(),
            api_key: String::new(),
            access_token: None,
            recruiter_id: String::new(),
            messages_table: default_messages_table(),
            favorites_table: default_favorites_table(),
            postings_table: default_postings_table(),
            timeout_seconds: default_supabase_timeout(),
            retry: default_store_retry(),
        }
    }
}

impl SupabaseConfig {
    /// Bearer token for the `Authorization` header
    pub fn bearer_token(&self) -> &str {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.api_key)
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Webhook (dispatch endpoint) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving `{ message, sessionId }`
    #[serde(default = "default_webhook_url")]
    pub url: String,

    /// Timeout for one webhook call (seconds); AI ranking can be slow
    #[serde(default = "default_webhook_timeout")]
    pub timeout_seconds: u64,

    /// Retry policy; the webhook is not idempotent so retries are off by default
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_webhook_url() -> String {
    "http://localhost:5678/webhook/recruitchat".to_string()
}

fn default_webhook_timeout() -> u64 {
    120
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
            timeout_seconds: default_webhook_timeout(),
            retry: RetryPolicy::none(),
        }
    }
}

/// Where chat messages are kept
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Remote PostgREST tables
    #[default]
    Supabase,
    /// Process memory only; nothing survives a restart
    Memory,
}

/// Message store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Append user and assistant messages to the log after each exchange.
    ///
    /// Disable when the webhook's own memory node already writes the log.
    #[serde(default = "default_persist_messages")]
    pub persist_messages: bool,
}

fn default_persist_messages() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            persist_messages: default_persist_messages(),
        }
    }
}

/// Background refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between history reloads (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

fn default_poll_interval() -> u64 {
    3
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl SyncConfig {
    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// Favorites configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// Ask for a job posting before a favorite is written
    #[serde(default = "default_require_job_posting")]
    pub require_job_posting: bool,

    /// Path of the local favorites cache database
    #[serde(default)]
    pub cache_path: Option<String>,
}

fn default_require_job_posting() -> bool {
    true
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            require_job_posting: default_require_job_posting(),
            cache_path: None,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            supabase: SupabaseConfig::default(),
            webhook: WebhookConfig::default(),
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            favorites: FavoritesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RecruitChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RecruitChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // Supabase overrides
        if let Ok(url) = std::env::var("RECRUITCHAT_SUPABASE_URL") {
            self.supabase.url = url;
        }

        if let Ok(key) = std::env::var("RECRUITCHAT_SUPABASE_KEY") {
            self.supabase.api_key = key;
        }

        if let Ok(token) = std::env::var("RECRUITCHAT_ACCESS_TOKEN") {
            self.supabase.access_token = Some(token);
        }

        if let Ok(recruiter) = std::env::var("RECRUITCHAT_RECRUITER_ID") {
            self.supabase.recruiter_id = recruiter;
        }

        // Webhook overrides
        if let Ok(url) = std::env::var("RECRUITCHAT_WEBHOOK_URL") {
            self.webhook.url = url;
        }

        if let Ok(timeout) = std::env::var("RECRUITCHAT_WEBHOOK_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.webhook.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid RECRUITCHAT_WEBHOOK_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(retries) = std::env::var("RECRUITCHAT_WEBHOOK_MAX_RETRIES") {
            if let Ok(value) = retries.parse() {
                self.webhook.retry.max_retries = value;
            } else {
                tracing::warn!("Invalid RECRUITCHAT_WEBHOOK_MAX_RETRIES: {}", retries);
            }
        }

        // Store and sync overrides
        if let Ok(backend) = std::env::var("RECRUITCHAT_STORE_BACKEND") {
            self.store.backend = match backend.to_lowercase().as_str() {
                "supabase" => StoreBackend::Supabase,
                "memory" => StoreBackend::Memory,
                _ => {
                    tracing::warn!("Invalid store backend: {}, using default", backend);
                    StoreBackend::default()
                }
            };
        }

        if let Ok(interval) = std::env::var("RECRUITCHAT_POLL_INTERVAL_SECONDS") {
            if let Ok(value) = interval.parse() {
                self.sync.poll_interval_seconds = value;
            } else {
                tracing::warn!("Invalid RECRUITCHAT_POLL_INTERVAL_SECONDS: {}", interval);
            }
        }

        if let Ok(json_logs) = std::env::var("RECRUITCHAT_LOG_JSON") {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json = v,
                Err(_) => tracing::warn!("Invalid RECRUITCHAT_LOG_JSON: {}", json_logs),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(url) = &cli.webhook_url {
            tracing::debug!(url = %url, "CLI override: webhook url");
            self.webhook.url = url.clone();
        }

        if cli.offline {
            tracing::debug!("CLI override: offline mode, using in-memory store");
            self.store.backend = StoreBackend::Memory;
        }
    }

    /// Validate the merged configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        validate_http_url("webhook.url", &self.webhook.url)?;

        if self.webhook.timeout_seconds == 0 {
            return Err(RecruitChatError::Config(
                "webhook.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sync.poll_interval_seconds == 0 {
            return Err(RecruitChatError::Config(
                "sync.poll_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.store.backend == StoreBackend::Supabase {
            validate_http_url("supabase.url", &self.supabase.url)?;

            if self.supabase.api_key.is_empty() {
                return Err(RecruitChatError::Config(
                    "supabase.api_key is required for the supabase backend".to_string(),
                )
                .into());
            }

            if self.supabase.recruiter_id.is_empty() {
                return Err(RecruitChatError::Config(
                    "supabase.recruiter_id is required for the supabase backend".to_string(),
                )
                .into());
            }

            if self.supabase.timeout_seconds == 0 {
                return Err(RecruitChatError::Config(
                    "supabase.timeout_seconds must be greater than 0".to_string(),
                )
                .into());
            }
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).map_err(|e| {
        RecruitChatError::Config(format!("{} is not a valid URL ({}): {}", field, value, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RecruitChatError::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))
        .into()),
    }
}

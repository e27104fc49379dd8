//! Settings structs and loading logic.
//!
//! All settings have sensible defaults and can be overridden via
//! configuration files or environment variables.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::scheduler::SchedulerConfig;
use crate::stream::StreamConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Transaction-indexer endpoint configuration.
    pub indexer: IndexerSettings,
    /// Chat-platform credentials.
    pub platform: PlatformSettings,
    /// Configuration-store backend.
    pub store: StoreSettings,
    /// Config read-through cache.
    pub cache: CacheSettings,
    /// Engine timer intervals and batch sizes.
    pub engine: EngineSettings,
    /// Realm package paths the event streams watch.
    pub realms: RealmSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// Files are loaded in this order (later overrides earlier):
    /// 1. built-in defaults
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (if present)
    /// 4. Environment variables with `RECONCILER_` prefix
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration is invalid or cannot be
    /// loaded.
    pub fn load(environment: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("indexer.url", "http://localhost:8546/rpc")?
            .set_default("indexer.request_timeout_ms", 30_000)?
            .set_default("indexer.max_retries", 3)?
            .set_default("indexer.retry_delay_ms", 500)?
            .set_default("platform.bot_token", "")?
            .set_default("store.backend", "memory")?
            .set_default("store.prefix", "guild-configs/")?
            .set_default("cache.enabled", true)?
            .set_default("cache.ttl_ms", 30_000)?
            .set_default("cache.max_capacity", 10_000)?
            .set_default("engine.event_tick_ms", 5_000)?
            .set_default("engine.query_interval_ms", 5_000)?
            .set_default("engine.verify_high_interval_ms", 60_000)?
            .set_default("engine.verify_medium_interval_ms", 300_000)?
            .set_default("engine.verify_low_interval_ms", 1_800_000)?
            .set_default("engine.verify_medium_batch", 10)?
            .set_default("engine.verify_low_page_size", 10)?
            .set_default("realms.user_events_package", "gno.land/r/guilds/users")?
            .set_default("realms.role_events_package", "gno.land/r/guilds/roles")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            // Load default configuration file
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            // Load environment-specific file
            .add_source(File::with_name(&format!("{config_dir}/{environment}")).required(false))
            // Override with environment variables (RECONCILER_ prefix)
            .add_source(
                Environment::with_prefix("RECONCILER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load settings from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    /// Validate settings and return any validation errors.
    ///
    /// # Errors
    ///
    /// Returns a list of validation error messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.indexer.url.is_empty() {
            errors.push("indexer.url cannot be empty".into());
        }
        if self.platform.bot_token.is_empty() {
            errors.push("platform.bot_token must be set".into());
        }
        if !matches!(self.store.backend.as_str(), "memory" | "object") {
            errors.push(format!(
                "store.backend must be 'memory' or 'object', got '{}'",
                self.store.backend
            ));
        }
        if self.engine.event_tick_ms == 0 {
            errors.push("engine.event_tick_ms must be non-zero".into());
        }
        if self.engine.verify_low_page_size == 0 {
            errors.push("engine.verify_low_page_size must be non-zero".into());
        }
        if self.cache.enabled && self.cache.max_capacity == 0 {
            errors.push("cache.max_capacity must be non-zero when the cache is enabled".into());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// The stream configuration this settings tree describes.
    #[must_use]
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            tick_interval: Duration::from_millis(self.engine.event_tick_ms),
            query_interval: Duration::from_millis(self.engine.query_interval_ms),
            user_events_package: self.realms.user_events_package.clone(),
            role_events_package: self.realms.role_events_package.clone(),
        }
    }

    /// The scheduler configuration this settings tree describes.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            high_interval: Duration::from_millis(self.engine.verify_high_interval_ms),
            medium_interval: Duration::from_millis(self.engine.verify_medium_interval_ms),
            low_interval: Duration::from_millis(self.engine.verify_low_interval_ms),
            medium_batch: self.engine.verify_medium_batch,
            low_page_size: self.engine.verify_low_page_size,
        }
    }
}

/// Transaction-indexer endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerSettings {
    /// JSON-RPC endpoint URL.
    pub url: String,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum retry attempts for transient failures.
    pub max_retries: u32,
    /// Base retry delay in milliseconds (doubled per attempt).
    pub retry_delay_ms: u64,
}

impl IndexerSettings {
    /// The request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The base retry delay as a `Duration`.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Chat-platform credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSettings {
    /// Bot token. MUST be set in production configuration.
    pub bot_token: String,
}

/// Configuration-store backend selection.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Backend kind: `memory` or `object`.
    pub backend: String,
    /// Document key prefix for the object backend.
    pub prefix: String,
}

/// Config read-through cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Whether the cache layer wraps the store.
    pub enabled: bool,
    /// Entry TTL in milliseconds.
    pub ttl_ms: u64,
    /// Maximum cached guilds.
    pub max_capacity: u64,
}

impl CacheSettings {
    /// The TTL as a `Duration`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Engine timer intervals and batch sizes.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Event-stream ticker period in milliseconds.
    pub event_tick_ms: u64,
    /// Per-query rerun interval in milliseconds.
    pub query_interval_ms: u64,
    /// High-priority verification period in milliseconds.
    pub verify_high_interval_ms: u64,
    /// Medium-priority verification period in milliseconds.
    pub verify_medium_interval_ms: u64,
    /// Low-priority verification period in milliseconds.
    pub verify_low_interval_ms: u64,
    /// Members per medium-priority pass.
    pub verify_medium_batch: usize,
    /// Members per low-priority page.
    pub verify_low_page_size: usize,
}

/// Realm package paths the event streams watch.
#[derive(Debug, Clone, Deserialize)]
pub struct RealmSettings {
    /// Package path of the user-linking realm.
    pub user_events_package: String,
    /// Package path of the role-linking realm.
    pub role_events_package: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (e.g. `info`, `guild_reconciler=debug`).
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

//! Orchestrator tuning: breaker limits, queue bounds, confidence gating,
//! balancer and insight windows.
//!
//! ```text
//! Precedence, strongest first:
//!
//! ┌──────────────────────────────────────────────┐
//! │  1. CLI overrides (ConfigResolver)           │  Invocation
//! ├──────────────────────────────────────────────┤
//! │  2. Environment Variables (CONDUCTOR_*)      │  Runtime override
//! ├──────────────────────────────────────────────┤
//! │  3. Project Config (.conductor/config.toml)  │  Project-specific
//! ├──────────────────────────────────────────────┤
//! │  4. Global Config (~/.conductor/config.toml) │  User defaults
//! ├──────────────────────────────────────────────┤
//! │  5. Default Values (compile-time)            │  Fallback
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `CONDUCTOR_CONFIDENCE_THRESHOLD` | `rules.confidence_threshold` | f64 |
//! | `CONDUCTOR_QUEUE_MAX_DEPTH` | `queue.max_depth` | usize |
//! | `CONDUCTOR_DISPATCH_TIMEOUT_MS` | `queue.dispatch_timeout_ms` | u64 |
//! | `CONDUCTOR_HEARTBEAT_TIMEOUT_MS` | `registry.heartbeat_timeout_ms` | u64 |
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.conductor/config.toml
//!
//! [registry]
//! heartbeat_timeout_ms = 60000
//! max_failures = 3
//! half_open_timeout_ms = 30000
//!
//! [queue]
//! max_depth = 200
//! max_attempts = 3
//! dispatch_timeout_ms = 5000
//!
//! [rules]
//! confidence_threshold = 0.6
//!
//! [balancer]
//! overload_threshold = 85.0
//! ```

mod error;
mod loader;
mod resolver;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use resolver::{ConfigResolver, NoOpResolver};
pub use types::{
    BalancerConfig, ConductorConfig, InsightConfig, QueueConfig, RegistryConfig, RulesConfig,
};

/// `~/.conductor`, or `./.conductor` when no home directory is known.
#[must_use]
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".conductor")
}

#[must_use]
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Looked up under the project root.
pub const PROJECT_CONFIG_DIR: &str = ".conductor";

pub const PROJECT_CONFIG_FILE: &str = "config.toml";

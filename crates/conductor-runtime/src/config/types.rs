//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use conductor_runtime::config::ConductorConfig;
///
/// let config = ConductorConfig::default();
/// assert_eq!(config.queue.max_depth, 200);
/// assert_eq!(config.registry.max_failures, 3);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConductorConfig {
    /// Health tracking and circuit breakers.
    pub registry: RegistryConfig,

    /// Orchestration queue.
    pub queue: QueueConfig,

    /// Rule evaluation and confidence.
    pub rules: RulesConfig,

    /// Load balancing.
    pub balancer: BalancerConfig,

    /// Anomaly and bottleneck heuristics.
    pub insight: InsightConfig,
}

impl ConductorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Values from `other` override values in `self` only if they
    /// differ from the default. This enables layered configuration.
    pub fn merge(&mut self, other: &Self) {
        self.registry.merge(&other.registry);
        self.queue.merge(&other.queue);
        self.rules.merge(&other.rules);
        self.balancer.merge(&other.balancer);
        self.insight.merge(&other.insight);
    }

    /// Checks values that would make the core misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.max_depth == 0 {
            return Err(ConfigError::invalid_value("queue.max_depth", "must be at least 1"));
        }
        if self.queue.dead_letter_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "queue.dead_letter_capacity",
                "must be at least 1",
            ));
        }
        if self.queue.max_attempts == 0 {
            return Err(ConfigError::invalid_value("queue.max_attempts", "must be at least 1"));
        }
        if self.registry.max_failures == 0 {
            return Err(ConfigError::invalid_value("registry.max_failures", "must be at least 1"));
        }
        if !(0.5..=0.95).contains(&self.rules.confidence_threshold) {
            return Err(ConfigError::invalid_value(
                "rules.confidence_threshold",
                "must be within [0.5, 0.95]",
            ));
        }
        if self.balancer.cpu_weight < 0.0 || self.balancer.memory_weight < 0.0 {
            return Err(ConfigError::invalid_value("balancer", "weights must not be negative"));
        }
        if self.insight.window < self.insight.min_samples {
            return Err(ConfigError::invalid_value(
                "insight.window",
                "must hold at least min_samples samples",
            ));
        }
        Ok(())
    }
}

fn differs(a: f64, b: f64) -> bool {
    (a - b).abs() > f64::EPSILON
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// A system without a heartbeat for this long is stale.
    pub heartbeat_timeout_ms: u64,

    /// Heartbeat sweep period.
    pub sweep_interval_ms: u64,

    /// Consecutive failures that open a breaker.
    pub max_failures: u32,

    /// Time an open breaker waits before going half-open.
    pub half_open_timeout_ms: u64,

    /// Breaker transition tick.
    pub breaker_check_interval_ms: u64,

    /// Cascade re-check period.
    pub cascade_check_interval_ms: u64,

    /// Memory budget for systems that do not declare one.
    pub default_memory_budget_mb: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 60_000,
            sweep_interval_ms: 30_000,
            max_failures: 3,
            half_open_timeout_ms: 30_000,
            breaker_check_interval_ms: 15_000,
            cascade_check_interval_ms: 30_000,
            default_memory_budget_mb: 512.0,
        }
    }
}

impl RegistryConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.heartbeat_timeout_ms != default.heartbeat_timeout_ms {
            self.heartbeat_timeout_ms = other.heartbeat_timeout_ms;
        }
        if other.sweep_interval_ms != default.sweep_interval_ms {
            self.sweep_interval_ms = other.sweep_interval_ms;
        }
        if other.max_failures != default.max_failures {
            self.max_failures = other.max_failures;
        }
        if other.half_open_timeout_ms != default.half_open_timeout_ms {
            self.half_open_timeout_ms = other.half_open_timeout_ms;
        }
        if other.breaker_check_interval_ms != default.breaker_check_interval_ms {
            self.breaker_check_interval_ms = other.breaker_check_interval_ms;
        }
        if other.cascade_check_interval_ms != default.cascade_check_interval_ms {
            self.cascade_check_interval_ms = other.cascade_check_interval_ms;
        }
        if differs(other.default_memory_budget_mb, default.default_memory_budget_mb) {
            self.default_memory_budget_mb = other.default_memory_budget_mb;
        }
    }
}

/// Orchestration queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending items.
    pub max_depth: usize,

    /// Dispatch attempts before an item is dead-lettered.
    pub max_attempts: u32,

    /// Dead-letter entries kept (oldest evicted).
    pub dead_letter_capacity: usize,

    /// Drain tick.
    pub drain_interval_ms: u64,

    /// Upper bound on a single dispatch.
    pub dispatch_timeout_ms: u64,

    /// Only items below this priority may be displaced when full.
    pub displacement_ceiling: u8,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_depth: 200,
            max_attempts: 3,
            dead_letter_capacity: 100,
            drain_interval_ms: 1_000,
            dispatch_timeout_ms: 5_000,
            displacement_ceiling: 5,
        }
    }
}

impl QueueConfig {
    /// Dispatch timeout as a [`Duration`].
    #[must_use]
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.max_depth != default.max_depth {
            self.max_depth = other.max_depth;
        }
        if other.max_attempts != default.max_attempts {
            self.max_attempts = other.max_attempts;
        }
        if other.dead_letter_capacity != default.dead_letter_capacity {
            self.dead_letter_capacity = other.dead_letter_capacity;
        }
        if other.drain_interval_ms != default.drain_interval_ms {
            self.drain_interval_ms = other.drain_interval_ms;
        }
        if other.dispatch_timeout_ms != default.dispatch_timeout_ms {
            self.dispatch_timeout_ms = other.dispatch_timeout_ms;
        }
        if other.displacement_ceiling != default.displacement_ceiling {
            self.displacement_ceiling = other.displacement_ceiling;
        }
    }
}

/// Rule engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Initial confidence threshold (adapted by feedback within [0.5, 0.95]).
    pub confidence_threshold: f64,

    /// Rule evaluation tick.
    pub evaluation_interval_ms: u64,

    /// Decisions kept in the log.
    pub decision_log_capacity: usize,

    /// Conflict records kept.
    pub conflict_log_capacity: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            evaluation_interval_ms: 10_000,
            decision_log_capacity: 1_000,
            conflict_log_capacity: 100,
        }
    }
}

impl RulesConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if differs(other.confidence_threshold, default.confidence_threshold) {
            self.confidence_threshold = other.confidence_threshold;
        }
        if other.evaluation_interval_ms != default.evaluation_interval_ms {
            self.evaluation_interval_ms = other.evaluation_interval_ms;
        }
        if other.decision_log_capacity != default.decision_log_capacity {
            self.decision_log_capacity = other.decision_log_capacity;
        }
        if other.conflict_log_capacity != default.conflict_log_capacity {
            self.conflict_log_capacity = other.conflict_log_capacity;
        }
    }
}

/// Load balancer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BalancerConfig {
    /// Balancing tick.
    pub interval_ms: u64,

    /// Load score above which a system may be shed.
    pub overload_threshold: f64,

    /// Only systems below this priority are shed.
    pub shed_priority_ceiling: u8,

    /// Weight of CPU percent in the load score.
    pub cpu_weight: f64,

    /// Weight of memory utilization percent in the load score.
    pub memory_weight: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 20_000,
            overload_threshold: 85.0,
            shed_priority_ceiling: 7,
            cpu_weight: 0.6,
            memory_weight: 0.4,
        }
    }
}

impl BalancerConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.interval_ms != default.interval_ms {
            self.interval_ms = other.interval_ms;
        }
        if differs(other.overload_threshold, default.overload_threshold) {
            self.overload_threshold = other.overload_threshold;
        }
        if other.shed_priority_ceiling != default.shed_priority_ceiling {
            self.shed_priority_ceiling = other.shed_priority_ceiling;
        }
        if differs(other.cpu_weight, default.cpu_weight) {
            self.cpu_weight = other.cpu_weight;
        }
        if differs(other.memory_weight, default.memory_weight) {
            self.memory_weight = other.memory_weight;
        }
    }
}

/// Statistical heuristics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsightConfig {
    /// Response-time samples kept per system.
    pub window: usize,

    /// Samples required before z-scores are computed.
    pub min_samples: usize,

    /// |z| at or above which a sample is anomalous.
    pub z_threshold: f64,

    /// Response time above which a bottleneck is reported.
    pub bottleneck_response_ms: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            window: 20,
            min_samples: 5,
            z_threshold: 3.0,
            bottleneck_response_ms: 2_000.0,
        }
    }
}

impl InsightConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.window != default.window {
            self.window = other.window;
        }
        if other.min_samples != default.min_samples {
            self.min_samples = other.min_samples;
        }
        if differs(other.z_threshold, default.z_threshold) {
            self.z_threshold = other.z_threshold;
        }
        if differs(other.bottleneck_response_ms, default.bottleneck_response_ms) {
            self.bottleneck_response_ms = other.bottleneck_response_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let config = ConductorConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(ConductorConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ConductorConfig::from_toml(
            r#"
            [queue]
            max_depth = 50

            [rules]
            confidence_threshold = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(config.queue.max_depth, 50);
        assert_eq!(config.queue.max_attempts, 3);
        assert!((config.rules.confidence_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.balancer, BalancerConfig::default());
    }

    #[test]
    fn merge_only_overrides_non_defaults() {
        let mut base = ConductorConfig::default();
        base.queue.max_depth = 10;
        base.registry.max_failures = 5;

        let mut overlay = ConductorConfig::default();
        overlay.registry.max_failures = 7;
        overlay.insight.z_threshold = 2.5;

        base.merge(&overlay);
        assert_eq!(base.queue.max_depth, 10);
        assert_eq!(base.registry.max_failures, 7);
        assert!((base.insight.z_threshold - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_zero_depth_and_bad_threshold() {
        assert!(ConductorConfig::default().validate().is_ok());

        let mut config = ConductorConfig::default();
        config.queue.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = ConductorConfig::default();
        config.rules.confidence_threshold = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_dead_letter_capacity() {
        let mut config = ConductorConfig::default();
        config.queue.dead_letter_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "queue.dead_letter_capacity"
        ));
    }

    #[test]
    fn dispatch_timeout_duration() {
        assert_eq!(
            QueueConfig::default().dispatch_timeout(),
            Duration::from_millis(5_000)
        );
    }
}

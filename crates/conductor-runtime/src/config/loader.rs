//! Layered configuration loading.
//!
//! ```text
//! defaults ─▶ ~/.conductor/config.toml ─▶ <project>/.conductor/config.toml ─▶ CONDUCTOR_*
//! ```
//!
//! Later layers win. Absent files are skipped silently; the merged
//! result must pass [`ConductorConfig::validate`].

use super::{default_config_path, ConductorConfig, ConfigError, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Reads `$var` into `$field`, failing on values that do not parse as `$ty`.
macro_rules! env_override {
    ($field:expr, $var:literal, $ty:ty) => {
        if let Ok(raw) = std::env::var($var) {
            $field = parse_trimmed::<$ty>(&raw).ok_or_else(|| {
                ConfigError::invalid_env_var($var, concat!("expected ", stringify!($ty)))
            })?;
        }
    };
}

/// Builds a [`ConductorConfig`] from the file and environment layers.
///
/// ```no_run
/// use conductor_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root("/srv/home-hub")
///     .skip_env_vars()
///     .load()?;
/// # Ok::<(), conductor_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    global_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    skip_env: bool,
    skip_global: bool,
    skip_project: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the user-level layer from `path` instead of `~/.conductor/config.toml`.
    #[must_use]
    pub fn with_global_config(self, path: impl Into<PathBuf>) -> Self {
        Self {
            global_path: Some(path.into()),
            ..self
        }
    }

    /// Directory holding `.conductor/config.toml`.
    #[must_use]
    pub fn with_project_root(self, root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: Some(root.into()),
            ..self
        }
    }

    /// Ignores `CONDUCTOR_*` variables.
    #[must_use]
    pub fn skip_env_vars(self) -> Self {
        Self {
            skip_env: true,
            ..self
        }
    }

    #[must_use]
    pub fn skip_global_config(self) -> Self {
        Self {
            skip_global: true,
            ..self
        }
    }

    #[must_use]
    pub fn skip_project_config(self) -> Self {
        Self {
            skip_project: true,
            ..self
        }
    }

    /// Merges every enabled layer over the defaults and validates the result.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when an existing file is unreadable or not valid
    /// TOML, a `CONDUCTOR_*` value is malformed, or a merged value is out
    /// of range.
    pub fn load(&self) -> Result<ConductorConfig, ConfigError> {
        let mut config = ConductorConfig::default();

        for path in self.file_layers() {
            if let Some(layer) = read_layer(&path)? {
                debug!(path = %path.display(), "config layer applied");
                config.merge(&layer);
            }
        }

        if !self.skip_env {
            apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Candidate files in precedence order, lowest first.
    fn file_layers(&self) -> Vec<PathBuf> {
        let mut layers = Vec::with_capacity(2);
        if !self.skip_global {
            layers.push(
                self.global_path
                    .clone()
                    .unwrap_or_else(default_config_path),
            );
        }
        if !self.skip_project {
            if let Some(root) = &self.project_root {
                layers.push(root.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILE));
            }
        }
        layers
    }
}

fn read_layer(path: &Path) -> Result<Option<ConductorConfig>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    ConductorConfig::from_toml(&text)
        .map(Some)
        .map_err(|e| ConfigError::parse_toml(path, e))
}

fn apply_env_overrides(config: &mut ConductorConfig) -> Result<(), ConfigError> {
    env_override!(config.rules.confidence_threshold, "CONDUCTOR_CONFIDENCE_THRESHOLD", f64);
    env_override!(config.queue.max_depth, "CONDUCTOR_QUEUE_MAX_DEPTH", usize);
    env_override!(config.queue.dispatch_timeout_ms, "CONDUCTOR_DISPATCH_TIMEOUT_MS", u64);
    env_override!(config.registry.heartbeat_timeout_ms, "CONDUCTOR_HEARTBEAT_TIMEOUT_MS", u64);
    Ok(())
}

fn parse_trimmed<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

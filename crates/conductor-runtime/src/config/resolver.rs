//! Final override layer applied after [`ConfigLoader`](super::ConfigLoader).
//!
//! ```text
//! ConfigLoader.load()  →  ConductorConfig (base)
//!                              │
//!                              ▼
//!                     ConfigResolver.apply()
//!                              │
//!                              ▼
//!                     ConductorConfig (final)
//! ```
//!
//! The CLI implements this for its flags so that command-line values
//! win over every file and environment layer.

use super::ConductorConfig;

/// Applies overrides to an already-loaded configuration.
pub trait ConfigResolver {
    /// Only values the resolver actually carries should be written,
    /// leaving every other field as loaded.
    fn apply(&self, config: &mut ConductorConfig);
}

/// Leaves the loaded configuration as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpResolver;

impl ConfigResolver for NoOpResolver {
    fn apply(&self, _config: &mut ConductorConfig) {}
}

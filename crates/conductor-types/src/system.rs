//! System classification and health status.
//!
//! # Status Lifecycle
//!
//! ```text
//!              breaker opens / heartbeat stale / cascade
//!   Online ─────────────────────────────────────────────▶ Degraded
//!     ▲                                                      │
//!     │        heartbeat (breaker half-open or closed)       │
//!     └──────────────────────────────────────────────────────┘
//!
//!   Online / Degraded ──(no heartbeat for offline timeout)──▶ Offline
//!   Offline ──(heartbeat)──▶ Online
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Closed set of capability categories a system may register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCategory {
    Climate,
    Lighting,
    Security,
    Energy,
    Safety,
    Comfort,
    Household,
    Wellness,
    Entertainment,
    Infrastructure,
}

impl SystemCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Climate,
        Self::Lighting,
        Self::Security,
        Self::Energy,
        Self::Safety,
        Self::Comfort,
        Self::Household,
        Self::Wellness,
        Self::Entertainment,
        Self::Infrastructure,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Climate => "climate",
            Self::Lighting => "lighting",
            Self::Security => "security",
            Self::Energy => "energy",
            Self::Safety => "safety",
            Self::Comfort => "comfort",
            Self::Household => "household",
            Self::Wellness => "wellness",
            Self::Entertainment => "entertainment",
            Self::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for SystemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a category string is not part of the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown system category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for SystemCategory {
    type Err = UnknownCategory;

    /// Parses a category name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Health status of a registered system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    #[default]
    Online,
    Degraded,
    Offline,
}

impl SystemStatus {
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Degraded => f.write_str("degraded"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

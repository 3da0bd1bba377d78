//! Clamped priority values.

use serde::{Deserialize, Deserializer, Serialize};

/// Priority in the closed range `1..=10` (10 is most important).
///
/// Construction never fails: out-of-range input is clamped. This holds
/// for deserialization too, so a definitions file that says
/// `priority = 42` yields `Priority::MAX`.
///
/// # Example
///
/// ```
/// use conductor_types::Priority;
///
/// assert_eq!(Priority::new(0).get(), 1);
/// assert_eq!(Priority::new(7).get(), 7);
/// assert_eq!(Priority::new(99).get(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Lowest priority.
    pub const MIN: Self = Self(1);
    /// Highest priority.
    pub const MAX: Self = Self(10);
    /// Middle of the range, used when a caller gives none.
    pub const NORMAL: Self = Self(5);

    /// Creates a priority, clamping `value` into `1..=10`.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value.clamp(1, 10) as u8)
    }

    /// Returns the raw value.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Returns the value as a fraction of [`Priority::MAX`] (0.1 ..= 1.0).
    #[must_use]
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Self::new(i64::from(value))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

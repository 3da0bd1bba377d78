//! Definition file errors.
//!
//! # Error Codes
//!
//! | Variant | Code |
//! |---------|------|
//! | [`DefinitionError::ReadFile`] | `DEFINITION_READ_FILE` |
//! | [`DefinitionError::Parse`] | `DEFINITION_PARSE` |
//! | [`DefinitionError::EmptyId`] | `DEFINITION_EMPTY_ID` |
//! | [`DefinitionError::DuplicateSystem`] | `DEFINITION_DUPLICATE_SYSTEM` |
//! | [`DefinitionError::DuplicateRule`] | `DEFINITION_DUPLICATE_RULE` |
//! | [`DefinitionError::DuplicateScenario`] | `DEFINITION_DUPLICATE_SCENARIO` |
//! | [`DefinitionError::InvalidCategory`] | `DEFINITION_INVALID_CATEGORY` |
//! | [`DefinitionError::UnknownScenario`] | `DEFINITION_UNKNOWN_SCENARIO` |
//! | [`DefinitionError::EmptyScenario`] | `DEFINITION_EMPTY_SCENARIO` |
//!
//! None are recoverable: the file has to be fixed.

use conductor_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definitions file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse definitions from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    /// A system, rule or scenario with a blank name.
    #[error("{kind} with empty name")]
    EmptyId { kind: &'static str },

    #[error("duplicate system: {0}")]
    DuplicateSystem(String),

    #[error("duplicate rule id: {0}")]
    DuplicateRule(String),

    #[error("duplicate scenario: {0}")]
    DuplicateScenario(String),

    #[error("system '{system}' has invalid category '{category}'")]
    InvalidCategory { system: String, category: String },

    /// A rule triggers a scenario that is not defined.
    #[error("rule '{rule}' triggers unknown scenario '{scenario}'")]
    UnknownScenario { rule: String, scenario: String },

    #[error("scenario '{0}' has no actions")]
    EmptyScenario(String),
}

impl ErrorCode for DefinitionError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "DEFINITION_READ_FILE",
            Self::Parse { .. } => "DEFINITION_PARSE",
            Self::EmptyId { .. } => "DEFINITION_EMPTY_ID",
            Self::DuplicateSystem(_) => "DEFINITION_DUPLICATE_SYSTEM",
            Self::DuplicateRule(_) => "DEFINITION_DUPLICATE_RULE",
            Self::DuplicateScenario(_) => "DEFINITION_DUPLICATE_SCENARIO",
            Self::InvalidCategory { .. } => "DEFINITION_INVALID_CATEGORY",
            Self::UnknownScenario { .. } => "DEFINITION_UNKNOWN_SCENARIO",
            Self::EmptyScenario(_) => "DEFINITION_EMPTY_SCENARIO",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        let parse = toml::from_str::<toml::Value>("= broken").unwrap_err();
        assert_error_codes(
            &[
                DefinitionError::ReadFile {
                    path: "x".into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "x"),
                },
                DefinitionError::Parse {
                    origin: "x".into(),
                    source: parse,
                },
                DefinitionError::EmptyId { kind: "rule" },
                DefinitionError::DuplicateSystem("x".into()),
                DefinitionError::DuplicateRule("x".into()),
                DefinitionError::DuplicateScenario("x".into()),
                DefinitionError::InvalidCategory {
                    system: "x".into(),
                    category: "y".into(),
                },
                DefinitionError::UnknownScenario {
                    rule: "x".into(),
                    scenario: "y".into(),
                },
                DefinitionError::EmptyScenario("x".into()),
            ],
            "DEFINITION_",
        );
    }
}

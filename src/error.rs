//! Error types shared by the behavior units.
//!
//! DESIGN
//! ======
//! None of these errors is fatal to a page. A configuration error falls back
//! to the declared default of its key, storage errors degrade to in-memory
//! state, and binding errors skip the offending declaration. Call sites log
//! and continue.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{key}` expects a number, got {value:?}")]
    InvalidNumber { key: String, value: String },
    #[error("`{key}` must not be empty")]
    EmptyValue { key: String },
}

// =============================================================================
// STORAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("failed to read `{key}`: {reason}")]
    Read { key: String, reason: String },
    #[error("failed to write `{key}`: {reason}")]
    Write { key: String, reason: String },
}

// =============================================================================
// BINDING
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("malformed action descriptor {0:?}")]
    MalformedAction(String),
    #[error("no controller registered as `{0}`")]
    UnknownController(String),
}

//! Typed error handling for the query engine
//!
//! Every failure is scoped to a single operation; nothing here is fatal to a session.
//!
//! # Error Categories
//!
//! - [`SessionError`]: failures of a single session call (fetch, lookup, filter input)
//! - [`FilterError`]: a filter patch that violates the clause schema
//! - [`ConfigError`]: invalid engine configuration
//! - [`TablesideError`]: umbrella type for callers that want one error to match on
//!
//! # Example
//!
//! ```rust,ignore
//! match session.apply_delete(id) {
//!     Ok(_) => {}
//!     Err(SessionError::NotFound { resource, id }) => {
//!         println!("{} {} is already gone", resource, id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use crate::core::coordinator::{LoadKind, Phase};
use thiserror::Error;
use uuid::Uuid;

/// The main error type for the engine
#[derive(Debug, Clone, Error)]
pub enum TablesideError {
    /// Session call errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TablesideError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            TablesideError::Session(e) => e.error_code(),
            TablesideError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TablesideError::Session(e) => e.is_retryable(),
            TablesideError::Config(_) => false,
        }
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors returned by session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The data source rejected an initial load, load-more or refresh
    #[error("{kind} failed: {message}")]
    Fetch { kind: LoadKind, message: String },

    /// Edit or delete addressed an unknown item
    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: Uuid },

    /// Insert collided with an existing identifier
    #[error("{resource} with id '{id}' already exists")]
    AlreadyExists { resource: &'static str, id: Uuid },

    /// A filter patch failed validation
    #[error(transparent)]
    InvalidFilterValue(#[from] FilterError),

    /// The call is not accepted in the current phase
    #[error("cannot {operation} while {phase}")]
    Busy {
        operation: &'static str,
        phase: Phase,
    },
}

impl SessionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Fetch { .. } => "FETCH_FAILURE",
            SessionError::NotFound { .. } => "NOT_FOUND",
            SessionError::AlreadyExists { .. } => "ALREADY_EXISTS",
            SessionError::InvalidFilterValue(_) => "INVALID_FILTER_VALUE",
            SessionError::Busy { .. } => "SESSION_BUSY",
        }
    }

    /// Fetch failures leave the session on its last stable state and can be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Fetch { .. } | SessionError::Busy { .. })
    }
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors raised while constructing a filter state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// The clause name is not declared in the schema
    #[error("unknown filter clause '{clause}'")]
    UnknownClause { clause: String },

    /// The clause exists but has a different kind
    #[error("filter clause '{clause}' is a {actual} clause, not a {expected} clause")]
    KindMismatch {
        clause: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Threshold value is NaN or infinite
    #[error("filter clause '{clause}' needs a finite value, got {value}")]
    NotFinite { clause: String, value: f64 },

    /// Threshold value lies outside the declared range
    #[error("filter clause '{clause}' value {value} is outside [{min}, {max}]")]
    OutOfRange {
        clause: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to engine configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The configuration could not be read or parsed
    #[error("failed to load configuration: {message}")]
    Parse { message: String },

    /// Page size must be strictly positive
    #[error("page_size must be greater than zero")]
    ZeroPageSize,

    /// A clause declaration is inconsistent
    #[error("invalid clause '{clause}': {message}")]
    InvalidClause { clause: String, message: String },
}

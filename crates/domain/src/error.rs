//! Domain error types.

use thiserror::Error;

/// Errors that can occur while building domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The priority string is not one of `low`, `medium` or `high`.
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),
}

//! Error types for cart synchronization.

use thiserror::Error;

/// All possible failures surfaced by the sync layer.
///
/// Errors are values, not panics. Line-scoped failures land on the affected
/// [`LineItem`](trolley_engine::LineItem) as an error state; failures with no
/// line to land on (remove, clear) surface through the store's error channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    // Transport errors
    #[error("network failure: {0}")]
    Network(String),

    // Request errors
    #[error("validation failure: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    // Aggregate errors
    #[error("cart clear incomplete: {failed} of {attempted} removals failed")]
    ClearPartial { failed: usize, attempted: usize },
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, CartError>;

//! Error types for the projection pipeline.
//!
//! The taxonomy is deliberately small. Missing foreign references and
//! reverted contract reads are *not* errors; handlers skip or substitute
//! defaults for those. Only a rejected store write halts event processing.

use thiserror::Error;

/// Errors raised by an [`crate::store::EntityStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store write rejected for {kind} '{id}': {reason}")]
    WriteFailed {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("store read failed for {kind} '{id}': {reason}")]
    ReadFailed {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("corrupt entity {kind} '{id}': {reason}")]
    Corrupt {
        kind: &'static str,
        id: String,
        reason: String,
    },
}

/// Errors surfaced out of a projection handler.
///
/// A `ProjectionError` aborts the current event and must be propagated to
/// the host; there is no retry policy inside the engine.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

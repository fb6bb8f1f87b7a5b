use thiserror::Error;

use crate::column::ColId;

/// Errors surfaced by the property framework.
///
/// A [`GabbroError::InvariantViolation`] indicates an optimizer internal bug, never bad
/// user input. Callers must abandon the current optimization attempt instead of catching
/// it and continuing: a plan built past a violated invariant may return wrong results.
#[derive(Debug, Error)]
pub enum GabbroError {
    #[error("optimizer invariant violation: {0}")]
    InvariantViolation(String),

    #[error("unknown column id {0}")]
    UnknownColumn(ColId),
}

pub type OptResult<T> = Result<T, GabbroError>;

//! Void pipeline error taxonomy

use crate::fill::geometry::BooleanError;
use crate::fill::index::RangeTreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoidError {
    /// Host requested cancellation; the pass is rolled back
    #[error("voiding cancelled")]
    Cancelled,
    /// Voids covered the whole shape; fragments are removed
    #[error("shape was fully voided away")]
    ShapeFullyVoided,
    /// Every fragment fell under the minimum area
    #[error("no fragments left after minimum-area filter")]
    NoShapesLeft,
    #[error("boolean operation failed: {0}")]
    BooleanOpFailed(#[from] BooleanError),
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("boundary {0} cannot be voided: {1}")]
    NotVoidable(u64, String),
    #[error("index error: {0}")]
    Index(#[from] RangeTreeError),
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

pub type VoidResult<T> = Result<T, VoidError>;

impl VoidError {
    /// The shape was consumed (voided away or filtered out). Callers treat
    /// this as a terminal success rather than a failure.
    pub fn is_consumed(&self) -> bool {
        matches!(self, VoidError::ShapeFullyVoided | VoidError::NoShapesLeft)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, VoidError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumed_classification() {
        assert!(VoidError::ShapeFullyVoided.is_consumed());
        assert!(VoidError::NoShapesLeft.is_consumed());
        assert!(!VoidError::Cancelled.is_consumed());
        assert!(!VoidError::Geometry("x".into()).is_consumed());
    }

    #[test]
    fn test_boolean_error_converts() {
        let err: VoidError = BooleanError::NonFinite("subject").into();
        assert!(matches!(err, VoidError::BooleanOpFailed(_)));
        assert!(err.to_string().contains("non-finite"));
    }
}

//! Engine error taxonomy.
//!
//! Every unit of engine work (one source, one scan chunk, one registry entry)
//! returns `Result<_, EngineError>`. The scheduler is the single place these
//! are logged and counted; nothing here is ever surfaced to a player.
//!
//! A full receiver set is not an error: distribution returns a zero transfer.

use crate::coord::Location;
use crate::item::RestoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A cell could not be read this tick. Retried on a later tick.
    #[error("world access at {0} is temporarily unavailable")]
    TransientWorldAccess(Location),

    /// A persisted entry references an invalid coordinate or dimension.
    /// The entry is purged.
    #[error("corrupt registry entry '{key}': {reason}")]
    RegistryCorruption { key: String, reason: String },

    /// A hard invariant was broken (e.g. item conservation). Aborts the
    /// unit of work only.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn corruption(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::RegistryCorruption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the scheduler should log this at error severity.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

impl From<RestoreError> for EngineError {
    fn from(err: RestoreError) -> Self {
        Self::InvariantViolation(format!("extracted item could not be restored: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{Coord, DimensionId};

    #[test]
    fn restore_failure_is_invariant_violation() {
        let err: EngineError = RestoreError::NoSuchSlot(3).into();
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("could not be restored"));
    }

    #[test]
    fn display_messages() {
        let loc = Location::new(DimensionId(0), Coord::new(1, 2, 3));
        assert_eq!(
            EngineError::TransientWorldAccess(loc).to_string(),
            "world access at 1,2,3@0 is temporarily unavailable"
        );
        let err = EngineError::corruption("source_x", "bad coordinate");
        assert_eq!(err.to_string(), "corrupt registry entry 'source_x': bad coordinate");
        assert!(!err.is_invariant_violation());
    }
}

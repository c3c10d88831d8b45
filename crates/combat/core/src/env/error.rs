//! Oracle access errors.

use crate::error::{CombatError, ErrorSeverity};
use crate::state::SpellId;

/// Errors raised when read-only content cannot be served.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    /// Spell definition was not found by id.
    #[error("spell definition {0} not found")]
    SpellNotFound(SpellId),

    /// A definition refers to another definition that does not exist.
    #[error("spell {spell} references missing spell {missing}")]
    DanglingReference { spell: SpellId, missing: SpellId },
}

impl CombatError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SpellNotFound(_) => "ORACLE_SPELL_NOT_FOUND",
            Self::DanglingReference { .. } => "ORACLE_DANGLING_REFERENCE",
        }
    }
}

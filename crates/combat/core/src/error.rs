//! Common error infrastructure for combat-core.
//!
//! The engine distinguishes three failure classes:
//!
//! - **Expected refusals** ([`AuraRefusal`]): a target is immune, dead, or an
//!   existing aura outranks the new one. These are ordinary outcomes, returned
//!   as values and logged at `debug`.
//! - **Invariant violations** ([`InvariantViolation`]): internal bookkeeping
//!   disagrees with itself. Logged at `error` with full context; the operation
//!   is refused and state is left untouched.
//! - **Content errors**: a definition references something that does not exist
//!   (e.g. a dangling trigger spell). Logged once per entry and skipped, see
//!   [`crate::state::World::report_content_error`].

use crate::state::{AuraId, EntityId, GameTime, SpellId};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Ordinary refusal - retrying later (or elsewhere) may succeed.
    ///
    /// Examples: target immune, diminished to zero, outranked by existing aura
    Recoverable,

    /// Invalid input - should not be retried without changes.
    ///
    /// Examples: unknown target, unknown spell id
    Validation,

    /// Internal error - bookkeeping desync between auras and actors.
    ///
    /// These indicate bugs and should be investigated.
    Internal,

    /// Engine cannot continue (missing required oracle).
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Contextual information attached to errors for debugging and diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ErrorContext {
    pub actor: Option<EntityId>,
    pub spell: Option<SpellId>,
    pub aura: Option<AuraId>,
    /// Simulation time at which the error was raised.
    pub time: GameTime,
    pub message: Option<&'static str>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(time: GameTime) -> Self {
        Self {
            actor: None,
            spell: None,
            aura: None,
            time,
            message: None,
        }
    }

    #[must_use]
    pub const fn with_actor(mut self, actor: EntityId) -> Self {
        self.actor = Some(actor);
        self
    }

    #[must_use]
    pub const fn with_spell(mut self, spell: SpellId) -> Self {
        self.spell = Some(spell);
        self
    }

    #[must_use]
    pub const fn with_aura(mut self, aura: AuraId) -> Self {
        self.aura = Some(aura);
        self
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

/// Common trait for all combat-core errors.
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait CombatError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Stable identifier for this error variant, used in logs and tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Internal bookkeeping disagreement detected by the engine.
///
/// Every variant carries the context captured when the violation was found.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("aura {aura} is referenced but no longer exists")]
    MissingAura { aura: AuraId, context: ErrorContext },

    #[error("actor {actor} is referenced but no longer exists")]
    MissingActor {
        actor: EntityId,
        context: ErrorContext,
    },

    #[error("aura {aura} has no application on its owner {owner}")]
    OwnerWithoutApplication {
        aura: AuraId,
        owner: EntityId,
        context: ErrorContext,
    },

    #[error("aura {aura} effect slot {slot} is not present on the aura")]
    MissingEffectSlot {
        aura: AuraId,
        slot: u8,
        context: ErrorContext,
    },
}

impl CombatError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::MissingAura { context, .. }
            | Self::MissingActor { context, .. }
            | Self::OwnerWithoutApplication { context, .. }
            | Self::MissingEffectSlot { context, .. } => Some(context),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAura { .. } => "INVARIANT_MISSING_AURA",
            Self::MissingActor { .. } => "INVARIANT_MISSING_ACTOR",
            Self::OwnerWithoutApplication { .. } => "INVARIANT_OWNER_WITHOUT_APPLICATION",
            Self::MissingEffectSlot { .. } => "INVARIANT_MISSING_EFFECT_SLOT",
        }
    }
}

impl InvariantViolation {
    /// Logs the violation at `error` level with its context.
    pub fn log(&self) {
        let ctx = self.context();
        tracing::error!(
            code = self.error_code(),
            actor = ?ctx.and_then(|c| c.actor),
            spell = ?ctx.and_then(|c| c.spell),
            aura = ?ctx.and_then(|c| c.aura),
            time = ?ctx.map(|c| c.time),
            note = ctx.and_then(|c| c.message).unwrap_or(""),
            "{self}"
        );
    }
}

/// Reasons an aura application was refused.
///
/// Refusals are ordinary outcomes. Only [`AuraRefusal::Internal`] indicates a bug.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuraRefusal {
    #[error("spell {0} has no definition")]
    UnknownSpell(SpellId),

    #[error("spell {0} has no aura effects")]
    NoAuraEffects(SpellId),

    #[error("target {0} does not exist")]
    TargetMissing(EntityId),

    #[error("target {0} is being cleaned up")]
    TargetInCleanup(EntityId),

    #[error("target {0} is dead")]
    TargetDead(EntityId),

    #[error("target {target} is immune to spell {spell}")]
    Immune { target: EntityId, spell: SpellId },

    #[error("spell {spell} was diminished to zero duration on {target}")]
    Diminished { target: EntityId, spell: SpellId },

    #[error("spell {spell} is outranked by existing aura {existing}")]
    Outranked { spell: SpellId, existing: AuraId },

    #[error("spell {spell} is weaker than exclusive aura {existing}")]
    NotHighest { spell: SpellId, existing: AuraId },

    #[error("aura was removed while its effects were being applied")]
    RemovedDuringApply(AuraId),

    #[error(transparent)]
    Internal(#[from] InvariantViolation),
}

impl CombatError for AuraRefusal {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownSpell(_) | Self::NoAuraEffects(_) | Self::TargetMissing(_) => {
                ErrorSeverity::Validation
            }
            Self::TargetInCleanup(_)
            | Self::TargetDead(_)
            | Self::Immune { .. }
            | Self::Diminished { .. }
            | Self::Outranked { .. }
            | Self::NotHighest { .. }
            | Self::RemovedDuringApply(_) => ErrorSeverity::Recoverable,
            Self::Internal(inner) => inner.severity(),
        }
    }

    fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Internal(inner) => inner.context(),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSpell(_) => "AURA_UNKNOWN_SPELL",
            Self::NoAuraEffects(_) => "AURA_NO_EFFECTS",
            Self::TargetMissing(_) => "AURA_TARGET_MISSING",
            Self::TargetInCleanup(_) => "AURA_TARGET_IN_CLEANUP",
            Self::TargetDead(_) => "AURA_TARGET_DEAD",
            Self::Immune { .. } => "AURA_IMMUNE",
            Self::Diminished { .. } => "AURA_DIMINISHED",
            Self::Outranked { .. } => "AURA_OUTRANKED",
            Self::NotHighest { .. } => "AURA_NOT_HIGHEST",
            Self::RemovedDuringApply(_) => "AURA_REMOVED_DURING_APPLY",
            Self::Internal(inner) => inner.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_severity_separates_bugs_from_outcomes() {
        let immune = AuraRefusal::Immune {
            target: EntityId(1),
            spell: SpellId(10),
        };
        assert!(immune.severity().is_recoverable());
        assert_eq!(immune.error_code(), "AURA_IMMUNE");

        let internal = AuraRefusal::from(InvariantViolation::MissingAura {
            aura: AuraId(3),
            context: ErrorContext::new(GameTime::ZERO).with_actor(EntityId(1)),
        });
        assert!(internal.severity().is_internal());
        assert_eq!(internal.error_code(), "INVARIANT_MISSING_AURA");
        assert_eq!(internal.context().and_then(|c| c.actor), Some(EntityId(1)));
    }
}

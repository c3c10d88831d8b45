use crate::state::{ItemId, SpellId};

/// Runtime context of one spell execution.
///
/// Carried through the damage/heal pipeline and the proc engine so that
/// nested triggers know how deep they are and what started them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellContext {
    pub spell: SpellId,
    /// Cast by a proc, periodic trigger or another spell rather than directly.
    pub triggered: bool,
    /// Definition of the aura or spell that caused this one.
    pub triggered_by: Option<SpellId>,
    /// Proc dispatch depth at which this spell was started.
    pub chain_depth: u32,
    pub cast_item: Option<ItemId>,
}

impl SpellContext {
    pub const fn new(spell: SpellId) -> Self {
        Self {
            spell,
            triggered: false,
            triggered_by: None,
            chain_depth: 0,
            cast_item: None,
        }
    }

    /// Context for a spell triggered by `source` at proc depth `depth`.
    pub const fn triggered(spell: SpellId, source: SpellId, depth: u32) -> Self {
        Self {
            spell,
            triggered: true,
            triggered_by: Some(source),
            chain_depth: depth,
            cast_item: None,
        }
    }

    pub const fn with_depth(mut self, depth: u32) -> Self {
        self.chain_depth = depth;
        self
    }

    pub const fn with_cast_item(mut self, item: ItemId) -> Self {
        self.cast_item = Some(item);
        self
    }

    pub fn is_triggered_by(&self, spell: SpellId) -> bool {
        self.triggered_by == Some(spell)
    }
}

//! Proc engine: auras reacting to combat events.
//!
//! A dispatch runs in three phases:
//!
//! 1. **Snapshot**: collect every eligible (aura, effect mask) pair of both
//!    participants, preparing charges and cooldowns as each is collected.
//! 2. **Fire**: run the triggered effects of each snapshot entry that is still
//!    applied when its turn comes.
//! 3. **Consume**: spend the charge or stack and drop auras that ran out.
//!
//! Nested dispatches are bounded by the chain depth limit; suppression depth
//! (`cannot_proc`) makes nested scans over an actor yield nothing.

mod dispatch;
mod eligibility;
mod entry;
mod event;
mod flags;

pub use dispatch::dispatch_proc;
pub use eligibility::proc_effect_mask;
pub use entry::{ProcEntry, ppm_chance};
pub use event::{ProcEvent, ProcEventInfo, ProcReport};
pub use flags::{ProcAttributes, ProcFlags, ProcHit, ProcSpellPhase, ProcSpellType};

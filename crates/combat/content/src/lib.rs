//! Data-driven combat content and loaders.
//!
//! This crate turns data files into the read-only inputs of `combat-core`:
//! - Spell definitions (RON)
//! - Spell groups and their stacking rules (RON)
//! - Combat tuning (TOML)
//!
//! [`SpellCatalog`] is the [`SpellOracle`](combat_core::SpellOracle) served
//! to the engine. A fixture catalog ships embedded in the crate for tools
//! and tests that run without a data directory.

pub mod catalog;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::{CatalogIssue, SpellCatalog, SpellGroupDef};

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, GroupLoader, SpellLoader};

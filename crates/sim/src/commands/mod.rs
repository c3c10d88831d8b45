mod run;
mod spells;

pub use run::Run;
pub use spells::Spells;

use std::path::Path;

use anyhow::Result;
use combat_content::{ContentFactory, SpellCatalog};
use combat_core::CombatConfig;

/// Catalog from `data_dir`, or the embedded fixtures.
pub(crate) fn load_catalog(data_dir: Option<&Path>) -> Result<SpellCatalog> {
    match data_dir {
        Some(dir) => ContentFactory::new(dir).load_catalog(),
        None => ContentFactory::embedded_catalog(),
    }
}

/// Tuning from an explicit file, the data directory, or the embedded default.
pub(crate) fn load_config(config: Option<&Path>, data_dir: Option<&Path>) -> Result<CombatConfig> {
    match (config, data_dir) {
        (Some(path), _) => combat_content::ConfigLoader::load(path),
        (None, Some(dir)) if dir.join("combat.toml").exists() => ContentFactory::new(dir).load_config(),
        _ => ContentFactory::embedded_config(),
    }
}

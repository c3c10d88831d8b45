//! Content factory for building the engine's inputs from data files.

use std::path::{Path, PathBuf};

use combat_core::{CombatConfig, SpellInfo};

use crate::catalog::{SpellCatalog, SpellGroupDef};
use crate::loaders::{ConfigLoader, GroupLoader, LoadResult, SpellLoader};

const EMBEDDED_CONFIG: &str = include_str!("../../data/combat.toml");
const EMBEDDED_SPELLS: &str = include_str!("../../data/spells.ron");
const EMBEDDED_GROUPS: &str = include_str!("../../data/spell_groups.ron");

/// Content factory that loads combat content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── combat.toml
/// ├── spells.ron
/// └── spell_groups.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load tuning from `combat.toml`.
    pub fn load_config(&self) -> LoadResult<CombatConfig> {
        ConfigLoader::load(&self.data_dir.join("combat.toml"))
    }

    /// Load spell definitions from `spells.ron`.
    pub fn load_spells(&self) -> LoadResult<Vec<SpellInfo>> {
        SpellLoader::load(&self.data_dir.join("spells.ron"))
    }

    /// Load spell groups from `spell_groups.ron`. The file is optional.
    pub fn load_groups(&self) -> LoadResult<Vec<SpellGroupDef>> {
        let path = self.data_dir.join("spell_groups.ron");
        if !path.exists() {
            return Ok(Vec::new());
        }
        GroupLoader::load(&path)
    }

    /// Load and validate the whole spell catalog.
    pub fn load_catalog(&self) -> LoadResult<SpellCatalog> {
        Ok(SpellCatalog::build(self.load_spells()?, self.load_groups()?))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Tuning shipped with the crate.
    pub fn embedded_config() -> LoadResult<CombatConfig> {
        ConfigLoader::parse(EMBEDDED_CONFIG)
    }

    /// Fixture catalog shipped with the crate.
    pub fn embedded_catalog() -> LoadResult<SpellCatalog> {
        let spells = SpellLoader::parse(EMBEDDED_SPELLS)?;
        let groups = GroupLoader::parse(EMBEDDED_GROUPS)?;
        Ok(SpellCatalog::build(spells, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn embedded_config_matches_defaults() {
        assert_eq!(ContentFactory::embedded_config().unwrap(), CombatConfig::default());
    }
}

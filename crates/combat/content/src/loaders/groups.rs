//! Spell group loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::SpellGroupDef;
use crate::loaders::{LoadResult, read_file};

/// Group file structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFile {
    pub groups: Vec<SpellGroupDef>,
}

/// Loader for spell groups from RON files.
pub struct GroupLoader;

impl GroupLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<SpellGroupDef>> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse spell group RON {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> LoadResult<Vec<SpellGroupDef>> {
        let file: GroupFile = ron::from_str(content)?;
        Ok(file.groups)
    }
}

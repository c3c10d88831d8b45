//! Combat tuning loader.

use std::path::Path;

use combat_core::CombatConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for combat tuning from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load tuning from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<CombatConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> LoadResult<CombatConfig> {
        let config: CombatConfig = toml::from_str(content)?;
        if config.max_proc_chain == 0 {
            anyhow::bail!("max_proc_chain must be at least 1");
        }
        if config.diminishing.default_curve.is_empty() {
            anyhow::bail!("diminishing.default_curve must not be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_keys_keep_defaults() {
        let config = ConfigLoader::parse("max_proc_chain = 4\n[crit]\nspell_pct = 200\n").unwrap();
        assert_eq!(config.max_proc_chain, 4);
        assert_eq!(config.crit.spell_pct, 200);
        assert_eq!(config.crit.melee_pct, CombatConfig::default().crit.melee_pct);
        assert_eq!(config.diminishing, CombatConfig::default().diminishing);
    }

    #[test]
    fn zero_chain_limit_is_rejected() {
        assert!(ConfigLoader::parse("max_proc_chain = 0").is_err());
    }
}

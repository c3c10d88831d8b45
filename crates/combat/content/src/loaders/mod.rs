//! Content loaders for reading combat data from files.
//!
//! Each loader has a `load` that reads a path and a `parse` that works on
//! text already in memory (the embedded fixtures use the latter).

pub mod config;
pub mod factory;
pub mod groups;
pub mod spells;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use groups::GroupLoader;
pub use spells::SpellLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

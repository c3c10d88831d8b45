//! List the spells of a catalog.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// List the spells of a catalog
#[derive(Parser)]
pub struct Spells {
    /// Data directory with spells.ron (defaults to the embedded fixtures)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

impl Spells {
    pub fn execute(self) -> Result<()> {
        let catalog = super::load_catalog(self.data_dir.as_deref())?;
        for spell in catalog.spells() {
            let kinds: Vec<String> = spell
                .effects
                .iter()
                .map(|effect| {
                    if effect.is_aura() {
                        format!("{}:{}", effect.kind, effect.aura)
                    } else {
                        effect.kind.to_string()
                    }
                })
                .collect();
            println!("{:>6}  {:<20} {}", spell.id.0, spell.name, kinds.join(", "));
        }
        if !catalog.issues().is_empty() {
            println!("\n{} entries skipped:", catalog.issues().len());
            for issue in catalog.issues() {
                println!("  {issue}");
            }
        }
        Ok(())
    }
}

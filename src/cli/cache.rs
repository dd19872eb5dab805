//! `addonpack cache`

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::cache::CacheStore;

/// Manage the externals cache.
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommands,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommands {
    /// Print the cache root
    Dir,

    /// Remove the entire externals cache
    Clear,
}

impl CacheCommand {
    /// Run the subcommand against the resolved cache root.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root cannot be resolved or removed.
    pub fn execute(self) -> Result<()> {
        let cache = CacheStore::new()?;
        match self.command {
            CacheSubcommands::Dir => {
                println!("{}", cache.root().display());
            }
            CacheSubcommands::Clear => {
                if cache.clear()? {
                    println!("✅ Cleared externals cache at {}", cache.root().display().to_string().green());
                } else {
                    println!("Cache at {} is already empty", cache.root().display());
                }
            }
        }
        Ok(())
    }
}

//! Durable bin management commands.

use clap::Subcommand;
use std::path::Path;
use tilepager::cache::CacheBin;
use tilepager::config::format_size;

use crate::error::CliError;
use crate::runner::{load_config, open_disk_bin};

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show entry count and size of the configured bin
    Stats,
    /// Remove every tile from the configured bin
    Clear,
}

pub fn run(config_path: Option<&Path>, action: CacheAction) -> Result<(), CliError> {
    let (_, config) = load_config(config_path)?;
    let bin = open_disk_bin(&config)?;

    match action {
        CacheAction::Stats => {
            println!("Disk bin: {}", bin.directory().display());
            println!("  Entries: {}", bin.entry_count());
            println!("  Size:    {}", format_size(bin.size_bytes()));
            Ok(())
        }
        CacheAction::Clear => {
            let entries = bin.entry_count();
            let bytes = bin.size_bytes();
            bin.clear()?;
            println!("Cleared disk bin: {}", bin.directory().display());
            println!("Deleted {} entries, freed {}", entries, format_size(bytes));
            Ok(())
        }
    }
}

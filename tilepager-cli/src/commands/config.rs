//! Configuration management commands.

use clap::Subcommand;
use std::path::Path;
use tilepager::config::ConfigFile;

use crate::error::CliError;
use crate::runner::load_config;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(config_path: Option<&Path>, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            let (path, _) = load_config(config_path)?;
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Init { force } => run_init(config_path, force),
    }
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let (path, config) = load_config(config_path)?;
    let exists = path.exists();

    println!("# {}{}", path.display(), if exists { "" } else { " (not found, defaults)" });
    println!("[pager]");
    println!("workers = {}", config.pager.workers);
    println!("range_factor = {}", config.pager.range_factor);
    println!("tick_interval_ms = {}", config.pager.tick_interval_ms);
    println!("verbose_warnings = {}", config.pager.verbose_warnings);
    println!("[cache]");
    println!("directory = {}", config.cache.directory.display());
    println!("bin = {}", config.cache.bin);
    println!("policy = {}", config.cache.policy);
    println!(
        "max_age_secs = {}",
        config.cache.max_age_secs.map(|s| s.to_string()).unwrap_or_default()
    );
    println!("memory_size = {}", tilepager::config::format_size(config.cache.memory_size));
    println!("[resources]");
    println!("max_idle_secs = {}", config.resources.max_idle_secs);
    println!("[compiler]");
    println!("max_verts_per_batch = {}", config.compiler.max_verts_per_batch);
    for bin in &config.compiler.lod_bins {
        println!("lod_bin.{} = {},{}", bin.tag, bin.lod_scale, bin.min_lod_scale);
    }
    println!("[logging]");
    println!("file = {}", config.logging.file.display());
    Ok(())
}

fn run_init(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(tilepager::config::config_file_path);
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

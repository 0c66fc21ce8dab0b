//! tilepager CLI - command-line front end for the tilepager library.

mod commands;
mod error;
mod runner;
mod synthetic;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::build::BuildArgs;
use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "tilepager")]
#[command(version, about = "Build and page procedurally compiled map tiles", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilepager/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    /// Mirror log output to stdout
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build one tile from synthetic features into the durable bin
    Build(BuildArgs),

    /// Page a grid of tiles in rounds and report cache sharing
    Simulate(SimulateArgs),

    /// Inspect or clear the durable bin
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Build(args) => {
            let runner = CliRunner::new(config_path, cli.debug, cli.verbose)?;
            commands::build::run(&runner, args)
        }
        Commands::Simulate(args) => {
            let runner = CliRunner::new(config_path, cli.debug, cli.verbose)?;
            commands::simulate::run(&runner, args)
        }
        Commands::Cache { action } => commands::cache::run(config_path, action),
        Commands::Config { command } => commands::config::run(config_path, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from([
            "tilepager", "build", "--level", "2", "--x", "1", "--y", "1", "--features", "6",
        ])
        .unwrap();
        match cli.command {
            Commands::Build(args) => {
                assert_eq!((args.level, args.x, args.y, args.features), (2, 1, 1, 6));
                assert!(args.name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tilepager", "cache", "stats", "--config", "/tmp/c.ini"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.ini")));
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Stats
            }
        ));
    }

    #[test]
    fn test_build_requires_coordinates() {
        assert!(Cli::try_parse_from(["tilepager", "build", "--level", "2"]).is_err());
    }
}

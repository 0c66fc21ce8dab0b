//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;
use tilepager::builder::BuildError;
use tilepager::cache::CacheError;
use tilepager::config::ConfigFileError;
use tilepager::director::PagingError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Tile address outside the profile
    InvalidTile(String),
    /// Durable cache could not be opened or modified
    Cache(CacheError),
    /// Tile build failed
    Build(BuildError),
    /// Paging director error
    Paging(PagingError),
    /// Worker threads could not be started
    Startup(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::InvalidTile(_) => 2,
            CliError::Cache(_) => 3,
            CliError::Build(_) | CliError::Paging(_) => 4,
            CliError::LoggingInit(_) | CliError::Startup(_) => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Check the configuration file with: tilepager config show");
                eprintln!("Or write a fresh one with:         tilepager config init --force");
            }
            CliError::Cache(CacheError::Io(_)) => {
                eprintln!();
                eprintln!("Make sure the cache directory exists and is writable.");
            }
            CliError::Build(BuildError::SourceUnavailable(_)) => {
                eprintln!();
                eprintln!("The feature source refused the request; retrying will not help");
                eprintln!("until its configuration changes.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidTile(msg) => write!(f, "Invalid tile: {}", msg),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Build(e) => write!(f, "Tile build failed: {}", e),
            CliError::Paging(e) => write!(f, "Paging failed: {}", e),
            CliError::Startup(e) => write!(f, "Failed to start tile workers: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Cache(e) => Some(e),
            CliError::Build(e) => Some(e),
            CliError::Paging(e) => Some(e),
            CliError::Startup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<BuildError> for CliError {
    fn from(e: BuildError) -> Self {
        CliError::Build(e)
    }
}

impl From<PagingError> for CliError {
    fn from(e: PagingError) -> Self {
        CliError::Paging(e)
    }
}

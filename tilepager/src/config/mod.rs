//! User configuration.
//!
//! `~/.tilepager/config.ini` is parsed into a [`ConfigFile`], from which the
//! typed runtime configs are derived:
//!
//! ```ignore
//! let file = ConfigFile::load()?;
//! let pager = PagerConfig::from(&file);
//! let compiler = CompilerSettings::from(&file);
//! let policy = CachePolicy::from(&file);
//! ```

mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    default_cache_dir, CacheSection, CompilerSection, ConfigFile, LoggingSection, PagerSection,
    ResourcesSection, DEFAULT_BIN, DEFAULT_MEMORY_SIZE,
};
pub use size::{format_size, parse_size, SizeParseError};

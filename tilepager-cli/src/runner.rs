//! CLI runner for common setup.
//!
//! Loads configuration, initializes logging and assembles the library
//! objects shared by the `build` and `simulate` commands.

use crate::error::CliError;
use crate::synthetic::{synthetic_loader, synthetic_styles, SyntheticSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tilepager::builder::{CompilerSettings, Session, TileBuilder};
use tilepager::cache::{CacheBin, CachePolicy, CacheSettings, DiskCacheBin};
use tilepager::config::{config_file_path, ConfigFile};
use tilepager::content::ExtrusionFactory;
use tilepager::logging::{default_log_file, init_logging, LoggingGuard};
use tilepager::manager::CacheManager;
use tracing::info;

/// Loads the configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<(PathBuf, ConfigFile), CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&path)?;
    Ok((path, config))
}

/// Opens the configured disk bin.
pub fn open_disk_bin(config: &ConfigFile) -> Result<DiskCacheBin, CliError> {
    let bin = DiskCacheBin::open(
        &config.cache.directory,
        config.cache.bin.clone(),
        config.cache.disk_size.map(|s| s as u64),
    )?;
    Ok(bin)
}

/// Everything a command needs to build tiles.
pub struct Workbench {
    pub manager: Arc<CacheManager>,
    pub source: Arc<SyntheticSource>,
    pub builder: TileBuilder,
}

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads configuration and initializes logging.
    ///
    /// Logs go to the configured file; `verbose` mirrors them to stdout.
    pub fn new(config_path: Option<&Path>, debug: bool, verbose: bool) -> Result<Self, CliError> {
        let (_, config) = load_config(config_path)?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging(&log_dir, &log_file, verbose, debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!("tilepager v{}", tilepager::VERSION);
        info!(command, "tilepager CLI command");
    }

    /// Assembles a session, synthetic source and builder for `level`.
    ///
    /// `bin` overrides the durable bin; `None` uses the configured disk bin.
    pub fn workbench(
        &self,
        level: u32,
        features_per_tile: usize,
        bin: Option<Arc<dyn CacheBin>>,
    ) -> Result<Workbench, CliError> {
        let manager = Arc::new(CacheManager::new(synthetic_loader()));
        let session = Arc::new(
            Session::new(manager.clone(), synthetic_styles(level))
                .with_settings(CompilerSettings::from(&self.config)),
        );
        let source = Arc::new(SyntheticSource::new(features_per_tile));
        let bin: Arc<dyn CacheBin> = match bin {
            Some(bin) => bin,
            None => Arc::new(open_disk_bin(&self.config)?),
        };

        let builder = TileBuilder::new()
            .with_session(session)
            .with_feature_source(source.clone())
            .with_content_factory(Arc::new(ExtrusionFactory::new()))
            .with_cache(CacheSettings::new(bin, CachePolicy::from(&self.config)))
            .with_range_factor(self.config.pager.range_factor)
            .with_verbose_warnings(self.config.pager.verbose_warnings);

        Ok(Workbench {
            manager,
            source,
            builder,
        })
    }
}

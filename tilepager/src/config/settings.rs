//! Settings structs and defaults for `config.ini`.

use crate::builder::{CompilerSettings, LodBin, DEFAULT_MAX_VERTS_PER_BATCH, DEFAULT_RANGE_FACTOR};
use crate::cache::CachePolicy;
use crate::director::{default_workers, PagerConfig, DEFAULT_MAX_IDLE, DEFAULT_TICK_INTERVAL};
use std::path::PathBuf;
use std::time::Duration;

/// Default durable cache bin id.
pub const DEFAULT_BIN: &str = "tiles";

/// Default in-memory bin size.
pub const DEFAULT_MEMORY_SIZE: usize = 512 * 1024 * 1024;

/// Parsed contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub pager: PagerSection,
    pub cache: CacheSection,
    pub resources: ResourcesSection,
    pub compiler: CompilerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagerSection {
    pub workers: usize,
    pub range_factor: f32,
    pub tick_interval_ms: u64,
    pub verbose_warnings: bool,
}

impl Default for PagerSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            range_factor: DEFAULT_RANGE_FACTOR,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            verbose_warnings: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSection {
    /// Base directory; bins live in `<directory>/<bin>/`.
    pub directory: PathBuf,
    pub bin: String,
    pub policy: CachePolicy,
    pub max_age_secs: Option<u64>,
    /// Size limit of the in-memory bin.
    pub memory_size: usize,
    /// Size limit of the disk bin; `None` is unbounded.
    pub disk_size: Option<usize>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            bin: DEFAULT_BIN.to_string(),
            policy: CachePolicy::read_write(),
            max_age_secs: None,
            memory_size: DEFAULT_MEMORY_SIZE,
            disk_size: None,
        }
    }
}

impl CacheSection {
    /// Policy with `max_age_secs` applied.
    pub fn effective_policy(&self) -> CachePolicy {
        match self.max_age_secs {
            Some(secs) => self.policy.with_max_age(Duration::from_secs(secs)),
            None => self.policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourcesSection {
    pub max_idle_secs: u64,
}

impl Default for ResourcesSection {
    fn default() -> Self {
        Self {
            max_idle_secs: DEFAULT_MAX_IDLE.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerSection {
    pub max_verts_per_batch: usize,
    pub lod_bins: Vec<LodBin>,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            max_verts_per_batch: DEFAULT_MAX_VERTS_PER_BATCH,
            lod_bins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSection {
    pub file: PathBuf,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            file: crate::logging::default_log_dir().join(crate::logging::default_log_file()),
        }
    }
}

/// Platform cache directory for durable bins.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("tilepager")
}

impl From<&ConfigFile> for PagerConfig {
    fn from(config: &ConfigFile) -> Self {
        PagerConfig {
            workers: config.pager.workers.max(1),
            range_factor: config.pager.range_factor,
            tick_interval: Duration::from_millis(config.pager.tick_interval_ms),
            max_idle: Duration::from_secs(config.resources.max_idle_secs),
            verbose_warnings: config.pager.verbose_warnings,
        }
    }
}

impl From<&ConfigFile> for CompilerSettings {
    fn from(config: &ConfigFile) -> Self {
        config
            .compiler
            .lod_bins
            .iter()
            .cloned()
            .fold(
                CompilerSettings::default().with_max_verts_per_batch(config.compiler.max_verts_per_batch),
                CompilerSettings::with_lod_bin,
            )
    }
}

impl From<&ConfigFile> for CachePolicy {
    fn from(config: &ConfigFile) -> Self {
        config.cache.effective_policy()
    }
}

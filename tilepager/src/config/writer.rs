//! INI serialization: `ConfigFile` to a commented `config.ini`.

use super::parser::LOD_BIN_PREFIX;
use super::settings::ConfigFile;
use super::size::format_size;
use std::fmt::Write;
use std::path::Path;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let max_age = config.cache.max_age_secs.map(|s| s.to_string()).unwrap_or_default();
    let disk_size = config.cache.disk_size.map(format_size).unwrap_or_default();

    let mut lod_bins = String::new();
    for bin in &config.compiler.lod_bins {
        let _ = writeln!(
            lod_bins,
            "{}{} = {},{}",
            LOD_BIN_PREFIX, bin.tag, bin.lod_scale, bin.min_lod_scale
        );
    }

    format!(
        r#"[pager]
; Number of tile worker threads
workers = {}
; Tile visibility range as a multiple of the tile bounding radius
range_factor = {}
; Housekeeping interval (milliseconds)
tick_interval_ms = {}
; Log every per-tile warning when a tile completes
verbose_warnings = {}

[cache]
; Base directory for durable bins. Blobs are stored in <directory>/<bin>/
directory = {}
bin = {}
; read_write, read_only, write_only or no_cache
policy = {}
; Entries older than this are rebuilt (seconds, empty = never expire)
max_age_secs = {}
; Size of the in-memory bin (supports KB, MB, GB suffixes)
memory_size = {}
; Size limit of the disk bin (empty = unbounded)
disk_size = {}

[resources]
; Unreferenced shared resources are evicted after this idle time (seconds)
max_idle_secs = {}

[compiler]
; Vertex budget of one merged geometry batch
max_verts_per_batch = {}
; Visibility bands per content tag: lod_bin.<tag> = <lod_scale>[,<min_lod_scale>]
{}
[logging]
file = {}
"#,
        config.pager.workers,
        config.pager.range_factor,
        config.pager.tick_interval_ms,
        config.pager.verbose_warnings,
        path_to_string(&config.cache.directory),
        config.cache.bin,
        config.cache.policy,
        max_age,
        format_size(config.cache.memory_size),
        disk_size,
        config.resources.max_idle_secs,
        config.compiler.max_verts_per_batch,
        lod_bins,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

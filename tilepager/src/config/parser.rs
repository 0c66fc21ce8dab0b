//! INI parsing: `Ini` to `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::builder::LodBin;
use crate::cache::CachePolicy;
use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of per-tag LOD keys in `[compiler]`.
pub(super) const LOD_BIN_PREFIX: &str = "lod_bin.";

/// Overlays the values found in `ini` on `ConfigFile::default()`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("pager")) {
        if let Some(v) = section.get("workers") {
            config.pager.workers = parse_num::<usize>("pager", "workers", v, "must be a positive integer")?;
            if config.pager.workers == 0 {
                return Err(invalid("pager", "workers", v, "must be at least 1"));
            }
        }
        if let Some(v) = section.get("range_factor") {
            let factor = parse_num::<f32>("pager", "range_factor", v, "must be a number")?;
            if factor.is_nan() || factor <= 0.0 {
                return Err(invalid("pager", "range_factor", v, "must be greater than 0"));
            }
            config.pager.range_factor = factor;
        }
        if let Some(v) = section.get("tick_interval_ms") {
            config.pager.tick_interval_ms =
                parse_num("pager", "tick_interval_ms", v, "must be a positive integer (milliseconds)")?;
        }
        if let Some(v) = section.get("verbose_warnings") {
            config.pager.verbose_warnings = parse_bool("pager", "verbose_warnings", v)?;
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "bin") {
            if crate::cache::validate_key(v).is_err() {
                return Err(invalid("cache", "bin", v, "must be a plain name without path separators"));
            }
            config.cache.bin = v.to_string();
        }
        if let Some(v) = section.get("policy") {
            config.cache.policy = CachePolicy::from_str(v).map_err(|_| {
                invalid("cache", "policy", v, "must be one of: read_write, read_only, write_only, no_cache")
            })?;
        }
        if let Some(v) = non_empty(section, "max_age_secs") {
            config.cache.max_age_secs =
                Some(parse_num("cache", "max_age_secs", v, "must be a positive integer (seconds)")?);
        }
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size = parse_size(v)
                .map_err(|_| invalid("cache", "memory_size", v, "expected format like '512MB' or '2GB'"))?;
        }
        if let Some(v) = non_empty(section, "disk_size") {
            config.cache.disk_size = Some(
                parse_size(v)
                    .map_err(|_| invalid("cache", "disk_size", v, "expected format like '20GB' or '500MB'"))?,
            );
        }
    }

    if let Some(section) = ini.section(Some("resources")) {
        if let Some(v) = section.get("max_idle_secs") {
            config.resources.max_idle_secs =
                parse_num("resources", "max_idle_secs", v, "must be a positive integer (seconds)")?;
        }
    }

    if let Some(section) = ini.section(Some("compiler")) {
        if let Some(v) = section.get("max_verts_per_batch") {
            let max = parse_num::<usize>("compiler", "max_verts_per_batch", v, "must be a positive integer")?;
            if max == 0 {
                return Err(invalid("compiler", "max_verts_per_batch", v, "must be at least 1"));
            }
            config.compiler.max_verts_per_batch = max;
        }
        for (key, value) in section.iter() {
            if let Some(tag) = key.strip_prefix(LOD_BIN_PREFIX) {
                let bin = parse_lod_bin(tag, value).map_err(|reason| invalid("compiler", key, value, reason))?;
                config.compiler.lod_bins.retain(|b| b.tag != bin.tag);
                config.compiler.lod_bins.push(bin);
            }
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

/// Parses `<lod_scale>[,<min_lod_scale>]`.
fn parse_lod_bin(tag: &str, value: &str) -> Result<LodBin, &'static str> {
    if tag.trim().is_empty() {
        return Err("tag name is empty");
    }
    let mut parts = value.split(',').map(str::trim);
    let scale: f32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or("expected '<lod_scale>[,<min_lod_scale>]'")?;
    let min_scale: f32 = match parts.next() {
        Some(s) => s.parse().map_err(|_| "min_lod_scale must be a number")?,
        None => 0.0,
    };
    if parts.next().is_some() {
        return Err("expected at most two values");
    }
    if scale <= 0.0 || min_scale < 0.0 || min_scale >= scale {
        return Err("scales must satisfy 0 <= min_lod_scale < lod_scale");
    }
    Ok(LodBin::new(tag.trim(), scale).with_min_lod_scale(min_scale))
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_num<T: FromStr>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError> {
    value.trim().parse().map_err(|_| invalid(section, key, value, reason))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

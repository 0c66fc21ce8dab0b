//! On-disk layout of a bin.
//!
//! ```text
//! <cache_dir>/<bin_id>/<key>.tpg
//! ```

use super::CacheError;
use std::path::{Path, PathBuf};

/// File extension of stored tile blobs.
pub const BLOB_EXTENSION: &str = "tpg";

/// Rejects keys that are not safe as a single file name.
pub fn validate_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

pub fn bin_directory(cache_dir: &Path, bin_id: &str) -> PathBuf {
    cache_dir.join(bin_id)
}

/// Full path of the blob stored under `key`.
pub fn blob_path(cache_dir: &Path, bin_id: &str, key: &str) -> Result<PathBuf, CacheError> {
    validate_key(key)?;
    Ok(bin_directory(cache_dir, bin_id).join(format!("{}.{}", key, BLOB_EXTENSION)))
}

/// Recovers the key from a blob path, if it looks like one.
pub(super) fn key_from_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != BLOB_EXTENSION {
        return None;
    }
    let key = path.file_stem()?.to_str()?;
    validate_key(key).ok()?;
    Some(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path() {
        let path = blob_path(Path::new("/cache"), "buildings", "14_2_3").unwrap();
        assert_eq!(path, PathBuf::from("/cache/buildings/14_2_3.tpg"));
    }

    #[test]
    fn test_rejects_unsafe_keys() {
        for key in ["", "..", "a/b", "a\\b", "tile 1", "x:y"] {
            assert!(validate_key(key).is_err(), "{:?} should be rejected", key);
        }
        assert!(validate_key("my-tile.v2_1").is_ok());
    }

    #[test]
    fn test_key_from_path() {
        assert_eq!(
            key_from_path(Path::new("/c/b/2_1_1.tpg")),
            Some("2_1_1".to_string())
        );
        assert_eq!(key_from_path(Path::new("/c/b/2_1_1.tmp")), None);
        assert_eq!(key_from_path(Path::new("/c/b/noext")), None);
    }
}

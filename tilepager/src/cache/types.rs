//! Core types for durable cache bins.

use super::CacheBin;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors that can occur during bin operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during disk operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters that cannot be used as a file name
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// Invalid configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// A stored blob and when it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlob {
    pub data: Vec<u8>,
    pub last_modified: SystemTime,
}

impl CachedBlob {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            last_modified: SystemTime::now(),
        }
    }
}

/// Which bin operations are allowed, and how long entries stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub readable: bool,
    pub writable: bool,
    pub max_age: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::read_write()
    }
}

impl CachePolicy {
    pub const fn read_write() -> Self {
        Self {
            readable: true,
            writable: true,
            max_age: None,
        }
    }

    pub const fn read_only() -> Self {
        Self {
            readable: true,
            writable: false,
            max_age: None,
        }
    }

    pub const fn write_only() -> Self {
        Self {
            readable: false,
            writable: true,
            max_age: None,
        }
    }

    pub const fn no_cache() -> Self {
        Self {
            readable: false,
            writable: false,
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// True if an entry written at `last_modified` is too old to use.
    pub fn is_expired(&self, last_modified: SystemTime) -> bool {
        match self.max_age {
            Some(max_age) => SystemTime::now()
                .duration_since(last_modified)
                .map(|age| age > max_age)
                .unwrap_or(false),
            None => false,
        }
    }

    fn name(&self) -> &'static str {
        match (self.readable, self.writable) {
            (true, true) => "read_write",
            (true, false) => "read_only",
            (false, true) => "write_only",
            (false, false) => "no_cache",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CachePolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read_write" | "readwrite" => Ok(Self::read_write()),
            "read_only" | "readonly" => Ok(Self::read_only()),
            "write_only" | "writeonly" => Ok(Self::write_only()),
            "no_cache" | "none" => Ok(Self::no_cache()),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache policy '{}'",
                other
            ))),
        }
    }
}

/// A bin together with the policy that gates it.
#[derive(Clone)]
pub struct CacheSettings {
    pub bin: Arc<dyn CacheBin>,
    pub policy: CachePolicy,
}

impl CacheSettings {
    pub fn new(bin: Arc<dyn CacheBin>, policy: CachePolicy) -> Self {
        Self { bin, policy }
    }

    pub fn reads_enabled(&self) -> bool {
        self.policy.readable
    }

    pub fn writes_enabled(&self) -> bool {
        self.policy.writable
    }
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("bin", &self.bin.id())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("read_write".parse::<CachePolicy>().unwrap(), CachePolicy::read_write());
        assert_eq!("READ_ONLY".parse::<CachePolicy>().unwrap(), CachePolicy::read_only());
        assert_eq!("write_only".parse::<CachePolicy>().unwrap(), CachePolicy::write_only());
        assert_eq!("no_cache".parse::<CachePolicy>().unwrap(), CachePolicy::no_cache());
        assert!("sometimes".parse::<CachePolicy>().is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [
            CachePolicy::read_write(),
            CachePolicy::read_only(),
            CachePolicy::write_only(),
            CachePolicy::no_cache(),
        ] {
            assert_eq!(policy.to_string().parse::<CachePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_expiry() {
        let policy = CachePolicy::read_write().with_max_age(Duration::from_secs(60));
        assert!(!policy.is_expired(SystemTime::now()));
        assert!(policy.is_expired(SystemTime::now() - Duration::from_secs(120)));
        assert!(!CachePolicy::read_write().is_expired(SystemTime::UNIX_EPOCH));
    }
}

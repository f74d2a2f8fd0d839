//! # Config
//!
//! Typed region server configuration: a TOML file (`riptide.toml`) loaded
//! into [`RegionServerConfig`], then `RIPTIDE_*` environment overrides
//! layered on top of it, matching the `RIPTIDE_`-prefixed variable names a
//! node operator already expects from this workspace's CLI.
//!
//! Each section's doc comment names the HBase-style dotted configuration
//! key (`region.memstore.flush.size`, `hstore.compactionThreshold`, ...) it
//! corresponds to; the TOML file itself uses ordinary nested tables
//! (`[memstore]`, `[wal]`, `[families.default]`, ...) rather than the dotted
//! key literally, since that reads better as actual file content.

mod env;
mod family;

pub use env::apply_env_overrides;
pub use family::{BloomMode, CompressionMode, EncodingMode, FamilyOverride, ReplicationScopeMode};

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnvValue { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `region.memstore.flush.size` and
/// `regionserver.global.memstore.size.upper/lower.limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemstoreConfig {
    pub flush_size_bytes: u64,
    /// Fraction of heap at which writes block until a flush catches up.
    pub global_upper_limit: f64,
    /// Fraction of heap at which background flushing kicks in.
    pub global_lower_limit: f64,
}

impl Default for MemstoreConfig {
    fn default() -> Self {
        Self { flush_size_bytes: 128 * 1024 * 1024, global_upper_limit: 0.4, global_lower_limit: 0.35 }
    }
}

/// `wal.logroll.period` and `wal.logroll.size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalSectionConfig {
    pub logroll_period_secs: u64,
    pub logroll_size_bytes: u64,
}

impl Default for WalSectionConfig {
    fn default() -> Self {
        let defaults = wal::RollPolicy::default();
        Self { logroll_period_secs: defaults.period.as_secs(), logroll_size_bytes: defaults.max_bytes }
    }
}

impl WalSectionConfig {
    #[must_use]
    pub fn to_roll_policy(&self) -> wal::RollPolicy {
        wal::RollPolicy { max_bytes: self.logroll_size_bytes, period: Duration::from_secs(self.logroll_period_secs) }
    }
}

/// `hstore.compactionThreshold` and `hstore.blockingStoreFiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HStoreConfig {
    pub compaction_threshold: usize,
    pub blocking_store_files: usize,
}

impl Default for HStoreConfig {
    fn default() -> Self {
        Self { compaction_threshold: 3, blocking_store_files: 10 }
    }
}

/// `hfile.format.version` and `hfile.index.max.chunksize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HFileConfig {
    /// Must be `2` or `3`; `sortedfile`'s reader already tolerates a
    /// writer-absent checksum for the v2 layout, but the writer in this
    /// workspace always emits the v3 header shape, so this is presently a
    /// recognized, validated, but non-load-bearing field.
    pub format_version: u8,
    pub index_max_chunk_size: usize,
}

impl Default for HFileConfig {
    fn default() -> Self {
        Self { format_version: 3, index_max_chunk_size: 128 * 1024 }
    }
}

/// `hfile.block.cache.size` and `block.cache.force.important`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockCacheSectionConfig {
    /// Fraction of heap given to the block cache; a caller turns this into
    /// a byte capacity for [`blockcache::CacheConfig`] once it knows the
    /// process's heap budget, which this crate has no opinion on.
    pub size_fraction: f64,
    /// Required `true` by this workspace's own testable properties: index
    /// and bloom blocks are always cached in `blockcache` regardless, so
    /// this mostly documents that contract rather than driving a behavior
    /// switch.
    pub force_cache_important: bool,
}

impl Default for BlockCacheSectionConfig {
    fn default() -> Self {
        Self { size_fraction: 0.4, force_cache_important: true }
    }
}

/// `snapshot.enabled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

/// `coprocessor.abort.on.error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoprocessorConfig {
    pub abort_on_error: bool,
}

impl Default for CoprocessorConfig {
    fn default() -> Self {
        Self { abort_on_error: true }
    }
}

impl CoprocessorConfig {
    #[must_use]
    pub fn to_abort_policy(&self) -> observer::AbortPolicy {
        if self.abort_on_error {
            observer::AbortPolicy::AbortOnError
        } else {
            observer::AbortPolicy::LogAndContinue
        }
    }
}

/// A region server's full configuration. `Default` gives every built-in
/// default; [`RegionServerConfig::load`] layers a TOML
/// file and then `RIPTIDE_*` environment variables on top of that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionServerConfig {
    pub memstore: MemstoreConfig,
    pub wal: WalSectionConfig,
    pub hstore: HStoreConfig,
    pub hfile: HFileConfig,
    pub block_cache: BlockCacheSectionConfig,
    pub snapshot: SnapshotConfig,
    pub coprocessor: CoprocessorConfig,
    /// Keyed by column family name; a family with no entry here gets
    /// [`FamilyOverride::default`].
    pub families: HashMap<String, FamilyOverride>,
}

impl Default for RegionServerConfig {
    fn default() -> Self {
        Self {
            memstore: MemstoreConfig::default(),
            wal: WalSectionConfig::default(),
            hstore: HStoreConfig::default(),
            hfile: HFileConfig::default(),
            block_cache: BlockCacheSectionConfig::default(),
            snapshot: SnapshotConfig::default(),
            coprocessor: CoprocessorConfig::default(),
            families: HashMap::new(),
        }
    }
}

impl RegionServerConfig {
    /// Loads from `path` if given (falling back to all built-in defaults if
    /// it doesn't exist), then applies `RIPTIDE_*` environment overrides,
    /// then validates. This is the one entry point callers should use.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p).map_err(|e| ConfigError::Io { path: p.display().to_string(), source: e })?;
                toml::from_str(&content)?
            }
            _ => Self::default(),
        };
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.memstore.global_upper_limit) || !(0.0..=1.0).contains(&self.memstore.global_lower_limit) {
            return Err(ConfigError::Invalid("global memstore limits must be fractions in [0, 1]".to_string()));
        }
        if self.memstore.global_lower_limit > self.memstore.global_upper_limit {
            return Err(ConfigError::Invalid("global memstore lower limit must not exceed the upper limit".to_string()));
        }
        if !matches!(self.hfile.format_version, 2 | 3) {
            return Err(ConfigError::Invalid(format!("hfile.format.version must be 2 or 3, got {}", self.hfile.format_version)));
        }
        if !(0.0..=1.0).contains(&self.block_cache.size_fraction) {
            return Err(ConfigError::Invalid("block cache size fraction must be in [0, 1]".to_string()));
        }
        if self.hstore.compaction_threshold == 0 {
            return Err(ConfigError::Invalid("hstore.compactionThreshold must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The override for `family`, or the column-family default if none was
    /// configured.
    #[must_use]
    pub fn family(&self, family: &str) -> FamilyOverride {
        self.families.get(family).cloned().unwrap_or_default()
    }
}

//! `RIPTIDE_*` environment overrides, applied after the TOML file loads, so
//! every caller (not just the REPL) gets a consistent override precedence.

use crate::{ConfigError, RegionServerConfig};

macro_rules! override_parsed {
    ($env_var:expr, $field:expr) => {
        if let Ok(raw) = std::env::var($env_var) {
            $field = raw.parse().map_err(|_| ConfigError::InvalidEnvValue { var: $env_var, value: raw })?;
        }
    };
}

/// Applies every recognized `RIPTIDE_*` variable found in the environment on
/// top of `config`, in place. Unset variables leave the existing value (the
/// TOML file's, or the built-in default) untouched.
pub fn apply_env_overrides(config: &mut RegionServerConfig) -> Result<(), ConfigError> {
    override_parsed!("RIPTIDE_MEMSTORE_FLUSH_SIZE", config.memstore.flush_size_bytes);
    override_parsed!("RIPTIDE_GLOBAL_MEMSTORE_UPPER_LIMIT", config.memstore.global_upper_limit);
    override_parsed!("RIPTIDE_GLOBAL_MEMSTORE_LOWER_LIMIT", config.memstore.global_lower_limit);
    override_parsed!("RIPTIDE_WAL_LOGROLL_PERIOD_SECS", config.wal.logroll_period_secs);
    override_parsed!("RIPTIDE_WAL_LOGROLL_SIZE", config.wal.logroll_size_bytes);
    override_parsed!("RIPTIDE_COMPACTION_THRESHOLD", config.hstore.compaction_threshold);
    override_parsed!("RIPTIDE_BLOCKING_STORE_FILES", config.hstore.blocking_store_files);
    override_parsed!("RIPTIDE_HFILE_FORMAT_VERSION", config.hfile.format_version);
    override_parsed!("RIPTIDE_HFILE_INDEX_MAX_CHUNK_SIZE", config.hfile.index_max_chunk_size);
    override_parsed!("RIPTIDE_BLOCK_CACHE_SIZE_FRACTION", config.block_cache.size_fraction);
    override_parsed!("RIPTIDE_BLOCK_CACHE_FORCE_IMPORTANT", config.block_cache.force_cache_important);
    override_parsed!("RIPTIDE_SNAPSHOT_ENABLED", config.snapshot.enabled);
    override_parsed!("RIPTIDE_COPROCESSOR_ABORT_ON_ERROR", config.coprocessor.abort_on_error);
    Ok(())
}

use region::FamilyConfig;

/// Builds the [`FamilyConfig`] a region opens a family's [`store::Store`]
/// with, from the node's configuration: [`config::FamilyOverride`] for the
/// per-family knobs, [`config::HStoreConfig`] for the compaction thresholds
/// that `store` otherwise has no opinion on.
#[must_use]
pub fn family_config(name: &str, config: &config::RegionServerConfig) -> FamilyConfig {
    let overrides = config.family(name);
    let mut fc = FamilyConfig::new(name);
    fc.encoding = overrides.encoding.to_encoding();
    fc.bloom_granularity = overrides.bloom.to_granularity();
    fc.max_versions = overrides.max_versions;
    fc.ttl_seconds = overrides.ttl_seconds;
    fc.includes_mvcc = overrides.includes_mvcc;
    fc.replication_scope = overrides.replication_scope.to_scope();
    fc.minor_compaction_min_files = config.hstore.compaction_threshold;
    fc.minor_compaction_max_files = config.hstore.blocking_store_files;
    fc
}

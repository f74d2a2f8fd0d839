use blockcodec::{ChecksumType, Encoding};
use replication::ReplicationScope;
use sortedfile::BloomGranularity;
use store::StoreConfig;

/// Per-column-family configuration a region opens its [`store::Store`]s
/// with, plus the knobs that live above `store` (MVCC tagging,
/// replication scope) and therefore aren't part of [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct FamilyConfig {
    pub name: String,
    pub encoding: Encoding,
    pub checksum_type: ChecksumType,
    pub bloom_granularity: BloomGranularity,
    pub cache_data_blocks: bool,
    pub max_versions: u32,
    pub ttl_seconds: Option<u64>,
    pub minor_compaction_ratio: f64,
    pub minor_compaction_min_files: usize,
    pub minor_compaction_max_files: usize,
    /// Whether writers tag each cell with its mvcc sequence (design note
    /// "MVCC via per-cell tags") so readers can enforce snapshot isolation
    /// beyond what `timestamp`-based filtering gives them for free.
    pub includes_mvcc: bool,
    pub replication_scope: ReplicationScope,
}

impl FamilyConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: Encoding::None,
            checksum_type: ChecksumType::Crc32,
            bloom_granularity: BloomGranularity::Row,
            cache_data_blocks: true,
            max_versions: 1,
            ttl_seconds: None,
            minor_compaction_ratio: 1.2,
            minor_compaction_min_files: 3,
            minor_compaction_max_files: 10,
            includes_mvcc: true,
            replication_scope: ReplicationScope::Local,
        }
    }

    pub(crate) fn store_config(&self) -> StoreConfig {
        StoreConfig {
            family: self.name.clone(),
            encoding: self.encoding,
            checksum_type: self.checksum_type,
            bloom_granularity: self.bloom_granularity,
            cache_data_blocks: self.cache_data_blocks,
            max_versions: self.max_versions,
            ttl_seconds: self.ttl_seconds,
            minor_compaction_ratio: self.minor_compaction_ratio,
            minor_compaction_min_files: self.minor_compaction_min_files,
            minor_compaction_max_files: self.minor_compaction_max_files,
        }
    }
}

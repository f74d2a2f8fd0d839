use serde::{Deserialize, Serialize};

/// Per-column-family overrides, the `cells.*` configuration keys. Kept as a
/// small mirror of the enums `blockcodec`/`sortedfile`/`replication` already
/// define rather than deriving `serde` on those crates' own types, so this
/// is the only crate in the workspace that needs to know what a TOML file
/// looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyOverride {
    /// `cells.includes.mvcc` — tag every cell with its commit sequence.
    pub includes_mvcc: bool,
    /// `cells.includes.tags` — carry tags at all (ACL/visibility/ttl
    /// markers); `false` means a writer may still attach the mvcc tag above,
    /// but nothing else.
    pub includes_tags: bool,
    /// `cells.compression.{algo}`. Only `"none"` validates today —
    /// `blockcodec::Compression` has no implemented codec yet (see its own
    /// doc comment) — but the key is recognized so a config file naming a
    /// real algorithm fails loudly at load time instead of silently storing
    /// cells uncompressed.
    pub compression: CompressionMode,
    /// `cells.bloom.{NONE,ROW,ROWCOL}`.
    pub bloom: BloomMode,
    /// `cells.encoding.{NONE,PREFIX,DIFF,FAST_DIFF}`.
    pub encoding: EncodingMode,
    pub max_versions: u32,
    pub ttl_seconds: Option<u64>,
    /// Not one of the named `cells.*` keys, but column-family-scoped in
    /// the same way: whether this family's edits leave the node at all.
    pub replication_scope: ReplicationScopeMode,
}

impl Default for FamilyOverride {
    fn default() -> Self {
        Self {
            includes_mvcc: true,
            includes_tags: true,
            compression: CompressionMode::None,
            bloom: BloomMode::Row,
            encoding: EncodingMode::None,
            max_versions: 1,
            ttl_seconds: None,
            replication_scope: ReplicationScopeMode::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    None,
}

impl CompressionMode {
    #[must_use]
    pub fn to_compression(self) -> blockcodec::Compression {
        match self {
            CompressionMode::None => blockcodec::Compression::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BloomMode {
    /// Recognized for compatibility with the HBase-style key space; the
    /// `sortedfile` writer always embeds a bloom block, so this currently
    /// behaves the same as `Row`.
    None,
    Row,
    #[serde(rename = "ROWCOL")]
    RowCol,
}

impl BloomMode {
    #[must_use]
    pub fn to_granularity(self) -> sortedfile::BloomGranularity {
        match self {
            BloomMode::None | BloomMode::Row => sortedfile::BloomGranularity::Row,
            BloomMode::RowCol => sortedfile::BloomGranularity::RowColumn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EncodingMode {
    None,
    Prefix,
    Diff,
    #[serde(rename = "FAST_DIFF")]
    FastDiff,
}

impl EncodingMode {
    #[must_use]
    pub fn to_encoding(self) -> blockcodec::Encoding {
        match self {
            EncodingMode::None => blockcodec::Encoding::None,
            EncodingMode::Prefix => blockcodec::Encoding::Prefix,
            EncodingMode::Diff => blockcodec::Encoding::Diff,
            EncodingMode::FastDiff => blockcodec::Encoding::FastDiff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationScopeMode {
    Local,
    Global,
}

impl ReplicationScopeMode {
    #[must_use]
    pub fn to_scope(self) -> replication::ReplicationScope {
        match self {
            ReplicationScopeMode::Local => replication::ReplicationScope::Local,
            ReplicationScopeMode::Global => replication::ReplicationScope::Global,
        }
    }
}

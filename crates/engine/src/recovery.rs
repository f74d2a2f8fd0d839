//! Cold-start path: picking up the shared WAL where the last process left
//! off, and reopening every region the node manifest names.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blockcache::BlockCache;
use observer::ObserverRegistry;
use parking_lot::Mutex;
use regionfs::RegionFileSystem;
use replication::ReplicationTap;
use wal::WalWriter;

use crate::manifest::NodeManifest;
use crate::{family, EngineError};

/// The highest existing `<NNN>.wal` segment id under `dir`, or `0` if the
/// directory is empty or absent — so reopening a node after a restart
/// appends to the most recent segment instead of quietly overwriting it.
pub(crate) fn latest_wal_segment_id(dir: &Path) -> Result<u64, EngineError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut max_id = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()).map(str::to_string) else { continue };
        if entry.path().extension().and_then(|e| e.to_str()) != Some("wal") {
            continue;
        }
        if let Ok(id) = stem.parse::<u64>() {
            max_id = max_id.max(id);
        }
    }
    Ok(max_id)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn reopen_regions(
    root: &Path,
    namespace: &str,
    table: &str,
    manifest: &NodeManifest,
    config: &config::RegionServerConfig,
    cache: Arc<BlockCache>,
    wal: Arc<Mutex<WalWriter>>,
    observers: Arc<ObserverRegistry>,
    replication: Option<Arc<ReplicationTap>>,
) -> Result<HashMap<u64, Arc<region::Region>>, EngineError> {
    let mut regions = HashMap::with_capacity(manifest.entries.len());
    for entry in &manifest.entries {
        let fs = RegionFileSystem::new(PathBuf::from(root), namespace, table, entry.encoded_name.clone());
        let Some(info) = fs.read_region_info()? else {
            tracing::warn!(encoded_name = %entry.encoded_name, "region named in manifest has no .regioninfo, skipping");
            continue;
        };
        let family_configs = entry.families.iter().map(|n| family::family_config(n, config)).collect();

        let region = region::Region::open(
            info.region_id,
            info,
            fs,
            family_configs,
            cache.clone(),
            wal.clone(),
            observers.clone(),
            replication.clone(),
            wal::Durability::SyncWal,
        )?;
        regions.insert(region.region_id(), Arc::new(region));
    }
    Ok(regions)
}

//! # Engine
//!
//! The node-level orchestrator that wires [`config`], [`region`], [`store`],
//! [`wal`], [`regionfs`], [`observer`], [`replication`], and [`scheduler`]
//! into a single [`Node`] facade — one process hosting some number of
//! [`region::Region`]s under a shared WAL stream, block cache, and
//! background worker pool.
//!
//! ## Module responsibilities
//!
//! | Module | Purpose |
//! |---|---|
//! | [`lib.rs`] | `Node` struct, constructor, accessors, `Debug` |
//! | [`recovery`] | reopening every region named in the node manifest |
//! | [`write`] | `put`/`delete`/`batch`/`check_and_mutate`/`increment`/`append`, flush-threshold trigger |
//! | [`read`] | `get`/`scan` |
//! | [`compaction`] | manual + scheduler-driven flush/compaction |
//! | [`split_merge`] | opening split/merge daughters from a live parent |
//! | [`manifest`] | which regions exist under a namespace/table, across restarts |
//! | [`family`] | turns [`config::RegionServerConfig`] into a [`region::FamilyConfig`] |
//!
//! ## Crash safety
//!
//! Every write lands in the shared WAL before the region's in-memory store;
//! a region replays its own slice of the WAL (filtered by region id) on
//! open. `Node::open` itself only ever reopens regions the manifest already
//! named — creating a brand new region is a separate, explicit call
//! ([`Node::create_region`]) so a crash between "manifest entry written"
//! and "region directory laid out" cannot leave a silently-absent region
//! that a restart would otherwise paper over.

mod compaction;
mod family;
mod manifest;
mod read;
mod recovery;
mod split_merge;
mod write;

pub use region::{BatchOutcome, Comparator, FamilyConfig, RegionScanner, RowMutation, ScanRequest, LATEST_TIMESTAMP};
pub use split_merge::{MergeRequest, SplitRequest};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use blockcache::{BlockCache, CacheConfig};
use observer::ObserverRegistry;
use parking_lot::{Mutex, RwLock};
use region::Region;
use regionfs::RegionFileSystem;
use replication::ReplicationTap;
use scheduler::{Scheduler, SchedulerConfig, WalRollTicker};
use thiserror::Error;
use wal::WalWriter;

use manifest::NodeManifest;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("region error: {0}")]
    Region(#[from] region::RegionError),
    #[error("region filesystem error: {0}")]
    RegionFs(#[from] regionfs::RegionFsError),
    #[error("wal error: {0}")]
    Wal(#[from] wal::WalError),
    #[error("observer error: {0}")]
    Observer(#[from] observer::ObserverError),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("no such region: {0}")]
    UnknownRegion(u64),
    #[error("region {0} is already open")]
    RegionAlreadyOpen(u64),
}

/// How often the background WAL roll ticker wakes up to check
/// [`wal::WalWriter::should_roll`] against the configured policy.
const WAL_ROLL_TICK: std::time::Duration = std::time::Duration::from_secs(30);

/// One process's worth of region hosting: a namespace/table's regions,
/// a shared WAL stream, block cache, scheduler, and hook registries.
///
/// `namespace`/`table` mirror the single-table scope [`region::Region`]
/// already assumes (the multi-table catalog this would need in a real
/// cluster is out of scope here, same as the rest of this workspace).
pub struct Node {
    root: PathBuf,
    namespace: String,
    table: String,
    config: config::RegionServerConfig,
    cache: Arc<BlockCache>,
    scheduler: Arc<Scheduler>,
    observers: Arc<ObserverRegistry>,
    replication: Option<Arc<ReplicationTap>>,
    wal: Arc<Mutex<WalWriter>>,
    manifest: Mutex<NodeManifest>,
    regions: RwLock<HashMap<u64, Arc<Region>>>,
    #[allow(dead_code)]
    roll_ticker: WalRollTicker,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("namespace", &self.namespace)
            .field("table", &self.table)
            .field("region_count", &self.regions.read().len())
            .field("cache_metrics", &self.cache.metrics())
            .finish()
    }
}

impl Node {
    /// Opens a node rooted at `root`, reopening every region named in its
    /// manifest. `cache_capacity_bytes` is the absolute block cache budget
    /// this node gets — this crate has no opinion on the process's total
    /// heap, so the caller turns `config.block_cache.size_fraction` into a
    /// byte count before calling this.
    pub fn open(
        root: impl Into<PathBuf>,
        namespace: impl Into<String>,
        table: impl Into<String>,
        config: config::RegionServerConfig,
        cache_capacity_bytes: u64,
        observers: Arc<ObserverRegistry>,
        replication: Option<Arc<ReplicationTap>>,
    ) -> Result<Self, EngineError> {
        let root = root.into();
        let namespace = namespace.into();
        let table = table.into();

        let wal_dir = root.join("WALs");
        let wal_writer = WalWriter::create(&wal_dir, recovery::latest_wal_segment_id(&wal_dir)?)?;
        let wal = Arc::new(Mutex::new(wal_writer));

        let cache = Arc::new(BlockCache::new(CacheConfig::with_capacity(cache_capacity_bytes)));
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));

        let node_manifest = NodeManifest::load_or_create(&root, &namespace, &table)?;
        let regions = recovery::reopen_regions(
            &root,
            &namespace,
            &table,
            &node_manifest,
            &config,
            cache.clone(),
            wal.clone(),
            observers.clone(),
            replication.clone(),
        )?;

        let roll_policy = config.wal.to_roll_policy();
        let roll_ticker = WalRollTicker::spawn(write::WalRollDriver { wal: wal.clone(), policy: roll_policy }, WAL_ROLL_TICK);

        Ok(Self {
            root,
            namespace,
            table,
            config,
            cache,
            scheduler,
            observers,
            replication,
            wal,
            manifest: Mutex::new(node_manifest),
            regions: RwLock::new(regions),
            roll_ticker,
        })
    }

    /// Lays out a brand new region's directory, opens it, and records it in
    /// the node manifest. `family_names` determines which families get a
    /// [`store::Store`] — table schema lives outside this crate.
    pub fn create_region(
        &self,
        region_id: u64,
        encoded_name: String,
        start_key: Vec<u8>,
        end_key: Vec<u8>,
        family_names: &[String],
    ) -> Result<Arc<Region>, EngineError> {
        if self.regions.read().contains_key(&region_id) {
            return Err(EngineError::RegionAlreadyOpen(region_id));
        }

        let info = regionfs::RegionInfo {
            namespace: self.namespace.clone(),
            table: self.table.clone(),
            region_encoded_name: encoded_name.clone(),
            region_id,
            start_key,
            end_key,
        };
        let region = self.open_one_region(&encoded_name, info, family_names)?;

        let mut manifest = self.manifest.lock();
        manifest.add(encoded_name, family_names.to_vec());
        manifest.save()?;

        self.regions.write().insert(region_id, region.clone());
        Ok(region)
    }

    fn open_one_region(&self, encoded_name: &str, info: regionfs::RegionInfo, family_names: &[String]) -> Result<Arc<Region>, EngineError> {
        let fs = RegionFileSystem::new(&self.root, &self.namespace, &self.table, encoded_name);
        let family_configs = family_names.iter().map(|n| family::family_config(n, &self.config)).collect();
        let region = Region::open(
            info.region_id,
            info,
            fs,
            family_configs,
            self.cache.clone(),
            self.wal.clone(),
            self.observers.clone(),
            self.replication.clone(),
            wal::Durability::SyncWal,
        )?;
        Ok(Arc::new(region))
    }

    /// Looks up an already-open region by id.
    pub fn region(&self, region_id: u64) -> Result<Arc<Region>, EngineError> {
        self.regions.read().get(&region_id).cloned().ok_or(EngineError::UnknownRegion(region_id))
    }

    #[must_use]
    pub fn region_ids(&self) -> Vec<u64> {
        self.regions.read().keys().copied().collect()
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.scheduler.clone()
    }

    #[must_use]
    pub fn cache(&self) -> Arc<BlockCache> {
        self.cache.clone()
    }

    #[must_use]
    pub fn config(&self) -> &config::RegionServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests;

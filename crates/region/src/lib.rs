//! # Region
//!
//! Request-level orchestration for one row-range: owns a
//! [`store::Store`] per column family, the row-latch table, the region's
//! MVCC read point, and the split/merge state machine. Depends on `store`,
//! `wal`, `regionfs`, `observer`, and `replication` but never the other way
//! around — this crate is the first thing in the workspace that wires all
//! of them together, mirroring the design note that Store "borrows the
//! Region's file system, cache handle, and scheduler through explicit
//! references passed at call time; no back-pointer to Region."
//!
//! ## MVCC and timestamps
//!
//! `store`/`membuffer` only ever compare one `read_version` against
//! `Cell::timestamp` — they have no separate notion of an MVCC sequence.
//! This crate folds the two together: every committed write reuses the
//! per-region WAL sequence number (already strictly increasing and total)
//! as both the cell's default timestamp (when the caller
//! leaves it as [`LATEST_TIMESTAMP`]) and, when the family has
//! `includes_mvcc` set, the value carried in the cell's
//! [`keycodec::Tag::mvcc`] tag — the "MVCC via per-cell tags" design note.
//! [`MvccClock`] tracks which sequence numbers have actually finished
//! committing, independent of which one was assigned most recently, so a
//! reader's snapshot never includes a write that's still in flight even if
//! a later-numbered one already landed.

mod family;
mod latch;
mod mutate;
mod mvcc;
mod scan;
mod split_merge;
mod state;

pub use family::FamilyConfig;
pub use mutate::{BatchOutcome, Comparator, RowMutation};
pub use scan::{RegionScanner, ScanRequest};
pub use split_merge::{MergeOutcome, SplitOutcome};
pub use state::RegionState;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use blockcache::BlockCache;
use keycodec::{Cell, CellType, Tag};
use mvcc::MvccClock;
use observer::{CheckAndMutate as ObserverCheckAndMutate, ObserverError, ObserverRegistry, WalRestoreEntry};
use parking_lot::{Mutex, RwLock};
use regionfs::{RegionFileSystem, RegionInfo};
use replication::ReplicationTap;
use store::{Store, StoreError};
use thiserror::Error;
use wal::{Durability, WalError, WalWriter};

use latch::RowLatches;

/// A cell's family as `&str`, for keying into `family_configs`/`stores`
/// (both `Cell::family` and HBase's own column-family names are
/// conventionally UTF-8, but [`keycodec::Cell`] stores it as raw bytes).
fn family_name(family: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(family)
}

/// Sentinel a caller sets on a cell's `timestamp` to mean "the region
/// assigns the real value at commit time", matching the on-disk sentinel
/// convention the rest of the workspace already sorts newest-first around.
pub const LATEST_TIMESTAMP: u64 = u64::MAX;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("region {0} is not online")]
    RegionNotOnline(u64),
    #[error("no such family: {0}")]
    NoSuchFamily(String),
    #[error("mutation targets row {other:?}, expected {row:?}")]
    RowMismatch { row: Vec<u8>, other: Vec<u8> },
    #[error("merge error: {0}")]
    MergeRegion(String),
    #[error("invalid split key: {0}")]
    InvalidSplitKey(String),
    #[error("region not found: {0}")]
    UnknownRegion(u64),
    #[error("corrupted snapshot: {0}")]
    CorruptedSnapshot(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("region filesystem error: {0}")]
    RegionFs(#[from] regionfs::RegionFsError),
    #[error("observer error: {0}")]
    Observer(#[from] ObserverError),
    #[error("batch failed: {0}")]
    BatchFailed(String),
}

/// Which hook pair (and counter) a row write is invoked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Put,
    Delete,
}

/// Relative strength of a resolved (non-`UseDefault`) [`Durability`] level,
/// weakest first — used to pick the strongest level requested across a
/// [`Region::batch`] call's mutations, since they share one WAL append.
fn durability_rank(d: &Durability) -> u8 {
    match d {
        Durability::SkipWal => 0,
        Durability::AsyncWal => 1,
        Durability::SyncWal => 2,
        Durability::FsyncWal => 3,
        Durability::UseDefault => unreachable!("durability must be resolved before ranking"),
    }
}

pub struct Region {
    region_id: u64,
    info: RwLock<RegionInfo>,
    state: RwLock<RegionState>,
    fs: RegionFileSystem,
    cache: Arc<BlockCache>,
    family_configs: HashMap<String, FamilyConfig>,
    stores: RwLock<HashMap<String, Store>>,
    wal: Arc<Mutex<WalWriter>>,
    row_latches: RowLatches,
    mvcc: MvccClock,
    observers: Arc<ObserverRegistry>,
    replication: Option<Arc<ReplicationTap>>,
    default_durability: Durability,
    next_scanner_id: AtomicU64,
}

impl Region {
    /// Opens a region: creates its directory layout if absent, opens one
    /// [`store::Store`] per configured family, replays the shared WAL
    /// directory forward from the oldest family's last flushed sequence,
    /// and transitions `Opening -> Open`.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        region_id: u64,
        info: RegionInfo,
        fs: RegionFileSystem,
        family_configs: Vec<FamilyConfig>,
        cache: Arc<BlockCache>,
        wal: Arc<Mutex<WalWriter>>,
        observers: Arc<ObserverRegistry>,
        replication: Option<Arc<ReplicationTap>>,
        default_durability: Durability,
    ) -> Result<Self, RegionError> {
        fs.create_region_dir()?;
        fs.write_region_info(&info)?;

        observers.run(|o, ctx| o.pre_open(ctx))?;

        let mut stores = HashMap::with_capacity(family_configs.len());
        let mut configs = HashMap::with_capacity(family_configs.len());
        for family in &family_configs {
            let dir = fs.family_dir(&family.name);
            let store = Store::open(&dir, family.store_config(), cache.clone())?;
            stores.insert(family.name.clone(), store);
            configs.insert(family.name.clone(), family.clone());
        }

        let replay_floor = stores.values().map(Store::max_flushed_sequence).min().unwrap_or(0);
        let mut max_replayed = replay_floor;
        let mut replay_err: Option<RegionError> = None;
        {
            let mut floors = HashMap::new();
            floors.insert(region_id, replay_floor);
            let wal_dir = wal.lock().dir().to_path_buf();
            wal::replay_dir(&wal_dir, &floors, |entry| {
                if entry.region_id != region_id || replay_err.is_some() {
                    return;
                }
                max_replayed = max_replayed.max(entry.sequence);
                let restore_entry = WalRestoreEntry { region_id: entry.region_id, sequence: entry.sequence, edits: entry.edits.clone() };
                if let Err(e) = observers.run(|o, ctx| o.pre_wal_restore(ctx, &restore_entry)) {
                    replay_err = Some(e.into());
                    return;
                }
                for cell in entry.edits {
                    if let Some(store) = stores.get(family_name(&cell.family).as_ref()) {
                        store.membuffer().insert(cell, entry.sequence, false);
                    }
                }
                if let Err(e) = observers.run(|o, ctx| o.post_wal_restore(ctx, &restore_entry)) {
                    replay_err = Some(e.into());
                }
            })?;
        }
        if let Some(e) = replay_err {
            return Err(e);
        }

        let region = Self {
            region_id,
            info: RwLock::new(info),
            state: RwLock::new(RegionState::Opening),
            fs,
            cache,
            family_configs: configs,
            stores: RwLock::new(stores),
            wal,
            row_latches: RowLatches::new(),
            mvcc: MvccClock::new(),
            observers,
            replication,
            default_durability,
            next_scanner_id: AtomicU64::new(1),
        };
        region.mvcc.fast_forward(max_replayed);
        *region.state.write() = RegionState::Open;
        region.observers.run(|o, ctx| o.post_open(ctx))?;
        Ok(region)
    }

    #[must_use]
    pub fn region_id(&self) -> u64 {
        self.region_id
    }

    /// The shared block cache this region's stores were opened with — what
    /// a node-level orchestrator reuses when it opens a split/merge
    /// daughter region against the same cache instance.
    #[must_use]
    pub fn cache(&self) -> Arc<BlockCache> {
        self.cache.clone()
    }

    #[must_use]
    pub fn state(&self) -> RegionState {
        *self.state.read()
    }

    #[must_use]
    pub fn info(&self) -> RegionInfo {
        self.info.read().clone()
    }

    /// HBase-style QoS classification: catalog regions
    /// get `HIGH_QOS`, everything else `NORMAL_QOS`. Whether a region is a
    /// catalog region is a fact about the table it belongs to, which this
    /// crate doesn't track — callers pass it in rather than this crate
    /// guessing from naming conventions.
    #[must_use]
    pub fn qos(&self, is_catalog_region: bool) -> Qos {
        if is_catalog_region {
            Qos::High
        } else {
            Qos::Normal
        }
    }

    fn family(&self, name: &str) -> Result<FamilyConfig, RegionError> {
        self.family_configs.get(name).cloned().ok_or_else(|| RegionError::NoSuchFamily(name.to_string()))
    }

    fn ensure_online(&self) -> Result<(), RegionError> {
        if self.state().is_online() {
            Ok(())
        } else {
            Err(RegionError::RegionNotOnline(self.region_id))
        }
    }

    fn transition(&self, next: RegionState) -> Result<(), RegionError> {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return Err(RegionError::RegionNotOnline(self.region_id));
        }
        *state = next;
        Ok(())
    }

    /// Single-row atomic put. Cells whose `timestamp` is [`LATEST_TIMESTAMP`]
    /// are stamped with the commit sequence; families configured
    /// `includes_mvcc` get that same sequence recorded as an MVCC tag.
    pub fn put(&self, row: Vec<u8>, cells: Vec<Cell>, durability: Durability) -> Result<u64, RegionError> {
        self.write_row(row, cells, durability, WriteKind::Put)
    }

    /// Single-row atomic delete; `cells` should already carry one of the
    /// delete [`keycodec::CellType`]s.
    pub fn delete(&self, row: Vec<u8>, cells: Vec<Cell>, durability: Durability) -> Result<u64, RegionError> {
        self.write_row(row, cells, durability, WriteKind::Delete)
    }

    fn write_row(&self, row: Vec<u8>, mut cells: Vec<Cell>, durability: Durability, kind: WriteKind) -> Result<u64, RegionError> {
        self.ensure_online()?;
        for cell in &cells {
            if cell.row != row {
                return Err(RegionError::RowMismatch { row, other: cell.row.clone() });
            }
        }

        let _guard = self.row_latches.lock_one(&row);

        let ctx = match kind {
            WriteKind::Put => self.observers.run(|o, ctx| o.pre_put(ctx, &cells))?,
            WriteKind::Delete => self.observers.run(|o, ctx| o.pre_delete(ctx, &cells))?,
        };

        let sequence = if ctx.is_bypassed() {
            // An observer fully replaced default processing; still consume
            // a sequence number so ordering stays total, per `WalWriter`'s
            // own contract for a skip-WAL append.
            let mut wal = self.wal.lock();
            wal.append(self.region_id, &[], Durability::SkipWal)?
        } else {
            let resolved = durability.resolve(self.default_durability);
            let mut wal = self.wal.lock();
            let sequence = wal.next_sequence(self.region_id);
            self.stamp_cells(&mut cells, sequence);
            let assigned = wal.append(self.region_id, &cells, resolved)?;
            debug_assert_eq!(assigned, sequence);
            drop(wal);

            let stores = self.stores.read();
            for cell in &cells {
                if let Some(store) = stores.get(family_name(&cell.family).as_ref()) {
                    store.membuffer().insert(cell.clone(), sequence, matches!(resolved, Durability::SkipWal));
                }
            }
            sequence
        };

        self.mvcc.complete(sequence);

        match kind {
            WriteKind::Put => {
                self.observers.run(|o, ctx| o.post_put(ctx, &cells))?;
            }
            WriteKind::Delete => {
                self.observers.run(|o, ctx| o.post_delete(ctx, &cells))?;
            }
        }

        if let Some(tap) = &self.replication {
            self.replicate(tap, sequence, &cells, false);
        }

        Ok(sequence)
    }

    /// Stamps any `LATEST_TIMESTAMP` cell with `sequence` and attaches the
    /// MVCC tag for families configured to carry one.
    fn stamp_cells(&self, cells: &mut [Cell], sequence: u64) {
        for cell in cells.iter_mut() {
            if cell.timestamp == LATEST_TIMESTAMP {
                cell.timestamp = sequence;
            }
            if self.family_configs.get(family_name(&cell.family).as_ref()).is_some_and(|f| f.includes_mvcc) {
                cell.tags.push(Tag::mvcc(sequence));
            }
        }
    }

    fn replicate(&self, tap: &ReplicationTap, sequence: u64, cells: &[Cell], is_control: bool) {
        let edit = replication::ReplicatedEdit { region_id: self.region_id, sequence, is_control, cells: cells.to_vec() };
        if let Some(edit) = tap.filter(edit, |family| {
            self.family_configs.get(family_name(family).as_ref()).map(|f| f.replication_scope).unwrap_or(replication::ReplicationScope::Local)
        }) {
            for batch in tap.batch(vec![edit]) {
                if let Err(e) = tap.ship(&batch) {
                    tracing::warn!(region_id = self.region_id, error = %e, "replication ship failed");
                }
            }
        }
    }

    /// Batches every mutation into one shared WAL append — a single record
    /// carrying all rows' cells under one sequence — so a crash mid-batch
    /// never leaves a partially-durable batch. A row whose cells don't all
    /// share its own row key fails that entry without touching the append;
    /// every other entry still commits together and reports the same
    /// sequence on success.
    pub fn batch(&self, mutations: Vec<RowMutation>) -> Vec<BatchOutcome> {
        if mutations.is_empty() {
            return Vec::new();
        }
        if self.ensure_online().is_err() {
            return mutations.iter().map(|_| Err(RegionError::RegionNotOnline(self.region_id))).collect();
        }

        let mut outcomes: Vec<Option<BatchOutcome>> = vec![None; mutations.len()];
        let mut rows: Vec<Vec<u8>> = Vec::with_capacity(mutations.len());
        let mut accepted: Vec<usize> = Vec::with_capacity(mutations.len());
        let mut cells: Vec<Cell> = Vec::new();
        for (idx, m) in mutations.iter().enumerate() {
            if let Some(bad) = m.cells.iter().find(|c| c.row != m.row) {
                outcomes[idx] = Some(Err(RegionError::RowMismatch { row: m.row.clone(), other: bad.row.clone() }));
                continue;
            }
            rows.push(m.row.clone());
            accepted.push(idx);
            cells.extend(m.cells.iter().cloned());
        }

        if accepted.is_empty() {
            return outcomes.into_iter().map(|o| o.expect("every entry assigned an outcome")).collect();
        }

        let _guard = self.row_latches.lock_many(&rows);

        let ctx = match self.observers.run(|o, ctx| o.pre_batch_mutate(ctx, &cells)) {
            Ok(ctx) => ctx,
            Err(e) => {
                let msg = e.to_string();
                for idx in &accepted {
                    outcomes[*idx] = Some(Err(RegionError::BatchFailed(msg.clone())));
                }
                return outcomes.into_iter().map(|o| o.expect("every entry assigned an outcome")).collect();
            }
        };

        let sequence = if ctx.is_bypassed() {
            let mut wal = self.wal.lock();
            match wal.append(self.region_id, &[], Durability::SkipWal) {
                Ok(seq) => seq,
                Err(e) => {
                    let msg = e.to_string();
                    for idx in &accepted {
                        outcomes[*idx] = Some(Err(RegionError::BatchFailed(msg.clone())));
                    }
                    return outcomes.into_iter().map(|o| o.expect("every entry assigned an outcome")).collect();
                }
            }
        } else {
            let durability = mutations
                .iter()
                .map(|m| m.durability.resolve(self.default_durability))
                .max_by_key(durability_rank)
                .unwrap_or(self.default_durability);
            let mut wal = self.wal.lock();
            let sequence = wal.next_sequence(self.region_id);
            self.stamp_cells(&mut cells, sequence);
            let assigned = match wal.append(self.region_id, &cells, durability) {
                Ok(assigned) => assigned,
                Err(e) => {
                    let msg = e.to_string();
                    for idx in &accepted {
                        outcomes[*idx] = Some(Err(RegionError::BatchFailed(msg.clone())));
                    }
                    return outcomes.into_iter().map(|o| o.expect("every entry assigned an outcome")).collect();
                }
            };
            debug_assert_eq!(assigned, sequence);
            drop(wal);

            let stores = self.stores.read();
            for cell in &cells {
                if let Some(store) = stores.get(family_name(&cell.family).as_ref()) {
                    store.membuffer().insert(cell.clone(), sequence, matches!(durability, Durability::SkipWal));
                }
            }
            sequence
        };

        self.mvcc.complete(sequence);

        let _ = self.observers.run(|o, ctx| o.post_batch_mutate(ctx, &cells));

        if let Some(tap) = &self.replication {
            self.replicate(tap, sequence, &cells, false);
        }

        for idx in &accepted {
            outcomes[*idx] = Some(Ok(sequence));
        }
        outcomes.into_iter().map(|o| o.expect("every entry assigned an outcome")).collect()
    }

    /// Holds the row latch for `target.row`, reads the current cell, and
    /// applies `mutation` only if `comparator` holds between the current
    /// value and `expected_value`. Returns whether the mutation ran.
    pub fn check_and_mutate(
        &self,
        target: Cell,
        comparator: Comparator,
        expected_value: Option<Vec<u8>>,
        mutation: Cell,
        durability: Durability,
    ) -> Result<bool, RegionError> {
        self.ensure_online()?;
        let _guard = self.row_latches.lock_one(&target.row);

        let op = ObserverCheckAndMutate { target: target.clone(), expected_value: expected_value.clone(), mutation: mutation.clone() };
        self.observers.run(|o, ctx| o.pre_check_and_mutate(ctx, &op))?;

        let current = self.get_locked(&target)?;
        let current_value = current.first().map(|c| c.value.as_slice());
        let applied = comparator.evaluate(current_value, expected_value.as_deref());

        if applied {
            let row = mutation.row.clone();
            let kind = if mutation.cell_type.is_delete() { WriteKind::Delete } else { WriteKind::Put };
            self.write_row_already_latched(row, vec![mutation], durability, kind)?;
        }

        self.observers.run(|o, ctx| o.post_check_and_mutate(ctx, &op, applied))?;
        Ok(applied)
    }

    /// Like [`Region::write_row`] but assumes the caller already holds the
    /// row latch (used by `check_and_mutate`, `increment`, and `append`,
    /// which all read-then-write under one latch acquisition).
    fn write_row_already_latched(&self, row: Vec<u8>, mut cells: Vec<Cell>, durability: Durability, kind: WriteKind) -> Result<u64, RegionError> {
        for cell in &cells {
            if cell.row != row {
                return Err(RegionError::RowMismatch { row, other: cell.row.clone() });
            }
        }
        let ctx = match kind {
            WriteKind::Put => self.observers.run(|o, ctx| o.pre_put(ctx, &cells))?,
            WriteKind::Delete => self.observers.run(|o, ctx| o.pre_delete(ctx, &cells))?,
        };
        if ctx.is_bypassed() {
            return Ok(self.mvcc.read_point());
        }

        let resolved = durability.resolve(self.default_durability);
        let sequence = {
            let mut wal = self.wal.lock();
            let sequence = wal.next_sequence(self.region_id);
            self.stamp_cells(&mut cells, sequence);
            let assigned = wal.append(self.region_id, &cells, resolved)?;
            debug_assert_eq!(assigned, sequence);
            sequence
        };

        {
            let stores = self.stores.read();
            for cell in &cells {
                if let Some(store) = stores.get(family_name(&cell.family).as_ref()) {
                    store.membuffer().insert(cell.clone(), sequence, matches!(resolved, Durability::SkipWal));
                }
            }
        }
        self.mvcc.complete(sequence);

        match kind {
            WriteKind::Put => self.observers.run(|o, ctx| o.post_put(ctx, &cells))?,
            WriteKind::Delete => self.observers.run(|o, ctx| o.post_delete(ctx, &cells))?,
        };
        Ok(sequence)
    }

    /// Read-modify-write: adds `delta` to the current value of `target`
    /// (interpreted as a big-endian `i64`, `0` if absent) and writes the
    /// sum back as a new version.
    pub fn increment(&self, target: Cell, delta: i64) -> Result<Cell, RegionError> {
        self.ensure_online()?;
        let _guard = self.row_latches.lock_one(&target.row);

        self.observers.run(|o, ctx| o.pre_increment(ctx, &target, delta))?;

        let current = self.get_locked(&target)?;
        let current_value = current.first().map(|c| i64::from_be_bytes(c.value.as_slice().try_into().unwrap_or([0; 8]))).unwrap_or(0);
        let next_value = current_value.wrapping_add(delta);

        let mut result = target.clone();
        result.timestamp = LATEST_TIMESTAMP;
        result.cell_type = CellType::Put;
        result.value = next_value.to_be_bytes().to_vec();

        let row = result.row.clone();
        self.write_row_already_latched(row, vec![result.clone()], Durability::UseDefault, WriteKind::Put)?;
        self.observers.run(|o, ctx| o.post_increment(ctx, &result))?;
        Ok(result)
    }

    /// Read-modify-write: appends `value` to the current value of `target`
    /// (empty if absent) and writes the result back as a new version.
    pub fn append(&self, target: Cell, value: Vec<u8>) -> Result<Cell, RegionError> {
        self.ensure_online()?;
        let _guard = self.row_latches.lock_one(&target.row);

        self.observers.run(|o, ctx| o.pre_append(ctx, &target))?;

        let current = self.get_locked(&target)?;
        let mut next_value = current.first().map(|c| c.value.clone()).unwrap_or_default();
        next_value.extend_from_slice(&value);

        let mut result = target.clone();
        result.timestamp = LATEST_TIMESTAMP;
        result.cell_type = CellType::Put;
        result.value = next_value;

        let row = result.row.clone();
        self.write_row_already_latched(row, vec![result.clone()], Durability::UseDefault, WriteKind::Put)?;
        self.observers.run(|o, ctx| o.post_append(ctx, &result))?;
        Ok(result)
    }

    /// Read-your-writes lookup for `target`'s (row, family, qualifier),
    /// returning up to `max_versions` visible cells at or before
    /// `target.timestamp` (use [`LATEST_TIMESTAMP`] for "current").
    pub fn get(&self, target: &Cell, max_versions: u32) -> Result<Vec<Cell>, RegionError> {
        self.ensure_online()?;
        self.observers.run(|o, ctx| o.pre_get(ctx, target))?;
        let result = self.get_versions(target, max_versions)?;
        self.observers.run(|o, ctx| o.post_get(ctx, target, &result))?;
        Ok(result)
    }

    pub fn exists(&self, target: &Cell) -> Result<bool, RegionError> {
        self.ensure_online()?;
        self.observers.run(|o, ctx| o.pre_exists(ctx, target))?;
        let found = !self.get_versions(target, 1)?.is_empty();
        self.observers.run(|o, ctx| o.post_exists(ctx, target, found))?;
        Ok(found)
    }

    fn get_locked(&self, target: &Cell) -> Result<Vec<Cell>, RegionError> {
        self.get_versions(target, 1)
    }

    fn get_versions(&self, target: &Cell, max_versions: u32) -> Result<Vec<Cell>, RegionError> {
        let family = self.family(family_name(&target.family).as_ref())?;
        let stores = self.stores.read();
        let Some(store) = stores.get(&family.name) else {
            return Err(RegionError::NoSuchFamily(family.name));
        };

        // `Store::get`/`get_raw` derive their own probe timestamp from the
        // `read_version` ceiling we pass in, ignoring `target.timestamp`
        // past (row, family, qualifier) — so fetching successive older
        // versions means lowering the ceiling ourselves between calls, not
        // mutating a probe cell.
        let requested = if target.timestamp == LATEST_TIMESTAMP { u64::MAX } else { target.timestamp };
        let mut ceiling = self.visible_read_version(requested);

        let mut out = Vec::new();
        for _ in 0..max_versions.max(1) {
            let Some(found) = store.get(target, ceiling)? else { break };
            let next_ceiling = found.timestamp.saturating_sub(1);
            out.push(found);
            if next_ceiling == 0 {
                break;
            }
            ceiling = next_ceiling;
        }
        Ok(out)
    }

    /// Clamps a caller-requested read version to this region's own MVCC
    /// read point, so a reader never sees a write that's still in flight.
    fn visible_read_version(&self, requested: u64) -> u64 {
        requested.min(self.mvcc.read_point())
    }

    /// Opens a scanner over `[request.start_row, request.end_row)`,
    /// resolving versions/TTL/tombstones per family exactly as
    /// [`store::Store::scan`] does, then merging per-family results back
    /// into rows. A server-side veto from `pre_scanner_filter_row` drops a
    /// row from the result entirely.
    pub fn scan(&self, request: ScanRequest, now_ts: u64) -> Result<RegionScanner, RegionError> {
        self.ensure_online()?;
        let scanner_id = self.next_scanner_id.fetch_add(1, Ordering::SeqCst);
        self.observers.run(|o, ctx| o.pre_scanner_open(ctx, scanner_id))?;

        let families: Vec<String> = match &request.families {
            Some(fs) => fs.clone(),
            None => self.family_configs.keys().cloned().collect(),
        };

        let start = request.start_row.as_ref().map(|r| Cell::new(r.clone(), Vec::new(), Vec::new(), u64::MAX, CellType::Put, Vec::new()));
        let end = request.end_row.as_ref().map(|r| Cell::new(r.clone(), Vec::new(), Vec::new(), u64::MAX, CellType::Put, Vec::new()));
        let read_version = self.mvcc.read_point();

        let stores = self.stores.read();
        let mut by_row: std::collections::BTreeMap<Vec<u8>, Vec<Cell>> = std::collections::BTreeMap::new();
        for family in &families {
            let Some(store) = stores.get(family) else { continue };
            for cell in store.scan(start.as_ref(), end.as_ref(), read_version, now_ts)? {
                by_row.entry(cell.row.clone()).or_default().push(cell);
            }
        }
        drop(stores);

        let mut rows = Vec::with_capacity(by_row.len());
        for (row, mut cells) in by_row {
            let keep = self.observers.run_filter(|o, ctx| o.pre_scanner_filter_row(ctx, scanner_id, &row))?;
            if !keep {
                continue;
            }
            cells.sort_by(keycodec::compare);
            rows.push(cells);
        }

        self.observers.run(|o, ctx| o.post_scanner_open(ctx, scanner_id))?;
        Ok(RegionScanner::new(scanner_id, rows, request.batch, request.reversed))
    }

    /// Flushes every family's store. Callers wanting this off the request
    /// thread submit it as a [`scheduler::ScheduledWork`] closure; this
    /// crate has no scheduler dependency of its own (see the module doc).
    pub fn flush(&self) -> Result<(), RegionError> {
        let stores = self.stores.read();
        for (family, store) in stores.iter() {
            self.observers.run(|o, ctx| o.pre_flush(ctx, family))?;
            if let Some(result) = store.flush()? {
                self.observers.run(|o, ctx| o.post_flush(ctx, family, result.file_id))?;
            }
        }
        Ok(())
    }

    pub fn compact(&self, major: bool) -> Result<(), RegionError> {
        let stores = self.stores.read();
        for (family, store) in stores.iter() {
            self.observers.run(|o, ctx| o.pre_compact(ctx, family))?;
            let result = if major { store.compact_major(now_unix())? } else { store.compact_minor(now_unix())? };
            if let Some(result) = result {
                self.observers.run(|o, ctx| o.post_compact(ctx, family, result.output_file_id))?;
            }
        }
        Ok(())
    }

    /// Summed `MemBuffer::approx_size` across every family's store, for a
    /// caller deciding whether this region is due for a flush.
    #[must_use]
    pub fn approx_memstore_size(&self) -> usize {
        self.stores.read().values().map(|store| store.membuffer().approx_size()).sum()
    }

    /// The configured family names this region was opened with, in no
    /// particular order.
    #[must_use]
    pub fn family_names(&self) -> Vec<String> {
        self.family_configs.keys().cloned().collect()
    }

    /// Every currently-live on-disk file handle for `family`, newest first —
    /// what a node-level split/merge uses to restore live
    /// [`store::ReferenceFile`]s into a daughter/merged region's store
    /// without re-opening files from scratch.
    pub fn file_handles(&self, family: &str) -> Result<Vec<Arc<sortedfile::SortedFileHandle>>, RegionError> {
        let stores = self.stores.read();
        let store = stores.get(family).ok_or_else(|| RegionError::NoSuchFamily(family.to_string()))?;
        Ok(store.file_handles())
    }

    /// Adds `reference` to `family`'s store, restoring a live reference a
    /// split or merge produced. See the `split_merge` module doc for why
    /// this has to be driven from a still-open parent's handles rather than
    /// the `.ref` marker files on disk.
    pub fn add_reference(&self, family: &str, reference: store::ReferenceFile) -> Result<(), RegionError> {
        let stores = self.stores.read();
        let store = stores.get(family).ok_or_else(|| RegionError::NoSuchFamily(family.to_string()))?;
        store.add_reference(reference);
        Ok(())
    }
}

/// Priority band a request is scheduled at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    High,
    Normal,
}

fn now_unix() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests;

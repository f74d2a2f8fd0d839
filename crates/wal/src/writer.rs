use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

use keycodec::Cell;

use crate::durability::Durability;
use crate::record::WalEntry;
use crate::roll::RollListener;
use crate::WalError;

/// Name of the segment file for `file_id` inside a WAL directory.
pub fn segment_path(dir: &Path, file_id: u64) -> PathBuf {
    dir.join(format!("{file_id:020}.wal"))
}

/// Result of a completed [`WalWriter::roll`].
#[derive(Debug, Clone)]
pub struct RolledSegment {
    pub closed_file_id: u64,
    pub closed_path: PathBuf,
    pub new_file_id: u64,
    pub new_path: PathBuf,
}

/// A single-stream, multi-region WAL segment writer.
///
/// Every region sharing this writer gets its own strictly increasing
/// sequence space (tracked in `seq_counters`); the underlying file is a
/// single interleaved append log, so `fsync`ing it covers every sequence
/// already appended regardless of which region wrote it.
///
/// Append failure is fatal for the node: a caller that sees `Err` from
/// [`WalWriter::append`] must abort every region whose edits may now be
/// lost, per the durability contract this component exists to uphold.
pub struct WalWriter {
    dir: PathBuf,
    file_id: u64,
    file: File,
    bytes_since_roll: u64,
    last_roll_at: Instant,
    seq_counters: HashMap<u64, u64>,
    scratch: Vec<u8>,
}

impl WalWriter {
    /// Creates a fresh WAL directory starting at `file_id`.
    pub fn create(dir: &Path, file_id: u64) -> Result<Self, WalError> {
        std::fs::create_dir_all(dir)?;
        let path = segment_path(dir, file_id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            file_id,
            file,
            bytes_since_roll: 0,
            last_roll_at: Instant::now(),
            seq_counters: HashMap::new(),
            scratch: Vec::new(),
        })
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The next sequence that will be assigned to `region_id` without
    /// consuming it.
    pub fn next_sequence(&self, region_id: u64) -> u64 {
        self.seq_counters.get(&region_id).copied().unwrap_or(0) + 1
    }

    /// Appends `edits` for `region_id` under `durability` (already resolved;
    /// `Durability::UseDefault` must not reach here), returning the sequence
    /// assigned to this append. A `SkipWal` append still consumes a
    /// sequence number — callers need a monotonic per-region sequence
    /// regardless of whether it was made durable.
    pub fn append(&mut self, region_id: u64, edits: &[Cell], durability: Durability) -> Result<u64, WalError> {
        debug_assert!(durability.is_concrete(), "append requires a resolved durability level");

        let counter = self.seq_counters.entry(region_id).or_insert(0);
        *counter += 1;
        let sequence = *counter;

        if matches!(durability, Durability::SkipWal) {
            return Ok(sequence);
        }

        let entry = WalEntry { region_id, sequence, edits: edits.to_vec() };
        entry.write(&mut self.file, &mut self.scratch)?;
        self.bytes_since_roll += (self.scratch.len() + 8) as u64;

        match durability {
            Durability::SkipWal => unreachable!(),
            Durability::AsyncWal => self.file.flush()?,
            Durability::SyncWal => {
                self.file.flush()?;
                self.file.sync_data()?;
            }
            Durability::FsyncWal => {
                self.file.flush()?;
                self.file.sync_all()?;
            }
            Durability::UseDefault => unreachable!("resolved before append"),
        }

        Ok(sequence)
    }

    /// Blocks until `sequence` for `region_id` is durably persisted. Because
    /// the file is a single append-ordered stream, an `fsync` now covers
    /// every sequence already written; this errors if `sequence` has not
    /// even been assigned yet.
    pub fn sync(&mut self, region_id: u64, sequence: u64) -> Result<(), WalError> {
        let assigned = self.seq_counters.get(&region_id).copied().unwrap_or(0);
        if sequence > assigned {
            return Err(WalError::NotYetAppended { region_id, sequence });
        }
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// `true` once either the size or period roll threshold from `policy`
    /// has been crossed.
    pub fn should_roll(&self, policy: &crate::roll::RollPolicy) -> bool {
        self.bytes_since_roll >= policy.max_bytes || self.last_roll_at.elapsed() >= policy.period
    }

    /// Closes the current segment and opens `file_id + 1`, invoking
    /// `listener`'s pre/post hooks around the swap. Unconditional: callers
    /// decide whether to call this via [`WalWriter::should_roll`] or an
    /// explicit request.
    pub fn roll(&mut self, listener: &dyn RollListener) -> Result<RolledSegment, WalError> {
        listener.pre_log_roll(self.file_id);

        self.file.flush()?;
        self.file.sync_all()?;
        let closed_file_id = self.file_id;
        let closed_path = segment_path(&self.dir, closed_file_id);

        let new_file_id = self.file_id + 1;
        let new_path = segment_path(&self.dir, new_file_id);
        let new_file = OpenOptions::new().create(true).append(true).open(&new_path)?;

        self.file = new_file;
        self.file_id = new_file_id;
        self.bytes_since_roll = 0;
        self.last_roll_at = Instant::now();

        listener.post_log_roll(closed_file_id, new_file_id);

        Ok(RolledSegment { closed_file_id, closed_path, new_file_id, new_path })
    }
}

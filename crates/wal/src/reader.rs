use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use keycodec::Cell;

use crate::record::WalEntry;
use crate::writer::segment_path;
use crate::WalError;

/// One edit yielded by [`replay_file`]/[`replay_dir`].
pub struct ReplayedEntry {
    pub region_id: u64,
    pub sequence: u64,
    pub edits: Vec<Cell>,
}

/// Replays one segment, invoking `apply` for every entry whose sequence is
/// greater than `per_region_min_seq.get(region_id)` (defaulting to 0, i.e.
/// replay everything for regions not present in the map). A truncated tail
/// is treated as a clean stop, matching the writer's own torn-write
/// tolerance: the crash that left it there did not durably commit it.
pub fn replay_file<R, F>(reader: R, per_region_min_seq: &HashMap<u64, u64>, mut apply: F) -> Result<(), WalError>
where
    R: Read,
    F: FnMut(ReplayedEntry),
{
    let mut reader = reader;
    while let Some(entry) = WalEntry::read(&mut reader)? {
        let min_seq = per_region_min_seq.get(&entry.region_id).copied().unwrap_or(0);
        if entry.sequence > min_seq {
            apply(ReplayedEntry {
                region_id: entry.region_id,
                sequence: entry.sequence,
                edits: entry.edits,
            });
        }
    }
    Ok(())
}

/// Opens and replays the segment file at `path`.
pub fn replay_path<F>(path: &Path, per_region_min_seq: &HashMap<u64, u64>, apply: F) -> Result<(), WalError>
where
    F: FnMut(ReplayedEntry),
{
    let file = File::open(path)?;
    replay_file(BufReader::new(file), per_region_min_seq, apply)
}

/// Replays every `<file_id>.wal` segment under `dir` in ascending file-id
/// order, as node recovery must: edits for a region can span a roll.
pub fn replay_dir<F>(dir: &Path, per_region_min_seq: &HashMap<u64, u64>, mut apply: F) -> Result<(), WalError>
where
    F: FnMut(ReplayedEntry),
{
    let mut file_ids = list_segment_ids(dir)?;
    file_ids.sort_unstable();
    for file_id in file_ids {
        let path = segment_path(dir, file_id);
        replay_path(&path, per_region_min_seq, &mut apply)?;
    }
    Ok(())
}

fn list_segment_ids(dir: &Path) -> Result<Vec<u64>, WalError> {
    let mut ids = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(it) => it,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(".wal") {
            if let Ok(id) = stem.parse::<u64>() {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

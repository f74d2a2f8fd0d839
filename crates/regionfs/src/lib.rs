//! # RegionFileSystem
//!
//! Safe layout and atomic rearrangement of a region's on-disk state:
//! `data/<ns>/<table>/<region>/.regioninfo`,
//! `data/<ns>/<table>/<region>/<family>/<fileId>`, `archive/<...>` for
//! retired files, `oldWALs/` for rolled WAL segments, `snapshots/<name>/`
//! for snapshot manifests. Every file a reader can see arrived there through
//! a single atomic rename from a staging name — partial files are never
//! visible to a concurrent reader.

mod region_info;
mod snapshot;

pub use region_info::RegionInfo;
pub use snapshot::{SnapshotFileRef, SnapshotManifest};

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionFsError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt .regioninfo: {0}")]
    CorruptRegionInfo(String),
    #[error("corrupt snapshot manifest: {0}")]
    CorruptedSnapshot(String),
}

/// Which side of a split boundary a reference file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSide {
    Top,
    Bottom,
}

impl fmt::Display for ReferenceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSide::Top => write!(f, "top"),
            ReferenceSide::Bottom => write!(f, "bottom"),
        }
    }
}

/// Owns the directory layout for one region under a shared root.
pub struct RegionFileSystem {
    root: PathBuf,
    namespace: String,
    table: String,
    region_encoded_name: String,
}

impl RegionFileSystem {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        namespace: impl Into<String>,
        table: impl Into<String>,
        region_encoded_name: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            namespace: namespace.into(),
            table: table.into(),
            region_encoded_name: region_encoded_name.into(),
        }
    }

    /// Builds the [`RegionFileSystem`] for another region under the same
    /// root/namespace/table — used when a split or merge needs to lay out
    /// a sibling region's directory before it has been opened.
    #[must_use]
    pub fn for_sibling(&self, region_encoded_name: impl Into<String>) -> Self {
        Self {
            root: self.root.clone(),
            namespace: self.namespace.clone(),
            table: self.table.clone(),
            region_encoded_name: region_encoded_name.into(),
        }
    }

    #[must_use]
    pub fn get_table_dir(&self) -> PathBuf {
        self.root.join("data").join(&self.namespace).join(&self.table)
    }

    #[must_use]
    pub fn region_dir(&self) -> PathBuf {
        self.get_table_dir().join(&self.region_encoded_name)
    }

    #[must_use]
    pub fn family_dir(&self, family: &str) -> PathBuf {
        self.region_dir().join(family)
    }

    #[must_use]
    pub fn archive_family_dir(&self, family: &str) -> PathBuf {
        self.root
            .join("archive")
            .join("data")
            .join(&self.namespace)
            .join(&self.table)
            .join(&self.region_encoded_name)
            .join(family)
    }

    #[must_use]
    pub fn old_wals_dir(&self) -> PathBuf {
        self.root.join("oldWALs")
    }

    #[must_use]
    pub fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.root.join("snapshots").join(name)
    }

    fn region_info_path(&self) -> PathBuf {
        self.region_dir().join(".regioninfo")
    }

    /// Creates the region directory (and its parents) if absent. Idempotent.
    pub fn create_region_dir(&self) -> Result<(), RegionFsError> {
        fs::create_dir_all(self.region_dir())?;
        Ok(())
    }

    /// Writes `.regioninfo`. A no-op if the file already holds the same
    /// bytes, so mtime is preserved across a no-change re-open — the
    /// property `.regioninfo` is written at most once relies on.
    pub fn write_region_info(&self, info: &RegionInfo) -> Result<(), RegionFsError> {
        self.create_region_dir()?;
        let encoded = info.encode();
        let path = self.region_info_path();
        if let Ok(existing) = fs::read(&path) {
            if existing == encoded {
                return Ok(());
            }
        }
        atomic_write(&path, &encoded)
    }

    pub fn read_region_info(&self) -> Result<Option<RegionInfo>, RegionFsError> {
        match fs::read(self.region_info_path()) {
            Ok(bytes) => Ok(Some(RegionInfo::decode(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the staging path a new store file for `family`/`file_id`
    /// should be written to. The family directory is created if absent.
    pub fn open_store_file(&self, family: &str, file_id: u64) -> Result<PathBuf, RegionFsError> {
        let dir = self.family_dir(family);
        fs::create_dir_all(&dir)?;
        Ok(dir.join(format!("{file_id:020}.sf.tmp")))
    }

    /// Publishes a staged store file by renaming it into place. The rename
    /// is the only visibility boundary: a reader listing `family_dir` never
    /// sees the `.tmp` name.
    pub fn commit_store_file(&self, family: &str, file_id: u64) -> Result<PathBuf, RegionFsError> {
        let dir = self.family_dir(family);
        let staged = dir.join(format!("{file_id:020}.sf.tmp"));
        let committed = dir.join(format!("{file_id:020}.sf"));
        fs::rename(&staged, &committed)?;
        Ok(committed)
    }

    /// Creates an (empty, marker-only) reference file recording that
    /// `family`'s daughter region should also read `parent_file_id`'s rows
    /// on `side` of the split boundary. The caller (region split logic)
    /// is responsible for opening the parent file itself and handing a live
    /// handle to the daughter `Store`; this file only needs to survive a
    /// restart so `has_references` and file enumeration see it.
    pub fn create_reference_file(
        &self,
        family: &str,
        parent_file_id: u64,
        side: ReferenceSide,
    ) -> Result<PathBuf, RegionFsError> {
        let dir = self.family_dir(family);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{parent_file_id:020}.{side}.ref"));
        File::create(&path)?;
        Ok(path)
    }

    /// `true` if `family`'s directory still holds any `.ref` marker —
    /// references become true files on the family's next compaction.
    pub fn has_references(&self, family: &str) -> Result<bool, RegionFsError> {
        let dir = self.family_dir(family);
        if !dir.exists() {
            return Ok(false);
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().ends_with(".ref") {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Lists the family subdirectories present under the region directory.
    pub fn list_families(&self) -> Result<Vec<String>, RegionFsError> {
        let dir = self.region_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                out.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Moves `file_name` out of `family`'s live directory into the archive,
    /// preserving the namespace/table/region/family path shape underneath
    /// `archive/`. Called once a compaction or split has made a file
    /// unreachable from any live reference.
    pub fn archive_file(&self, family: &str, file_name: &str) -> Result<PathBuf, RegionFsError> {
        let dest_dir = self.archive_family_dir(family);
        fs::create_dir_all(&dest_dir)?;
        let src = self.family_dir(family).join(file_name);
        let dest = dest_dir.join(file_name);
        fs::rename(&src, &dest)?;
        Ok(dest)
    }

    /// Writes a snapshot manifest under `snapshots/<name>/manifest`. No
    /// file bytes are copied — the manifest only records which files, by
    /// name, made up the table.
    pub fn write_snapshot_manifest(&self, name: &str, manifest: &SnapshotManifest) -> Result<(), RegionFsError> {
        let dir = self.snapshot_dir(name);
        fs::create_dir_all(&dir)?;
        atomic_write(&dir.join("manifest"), &manifest.encode())
    }

    pub fn read_snapshot_manifest(&self, name: &str) -> Result<SnapshotManifest, RegionFsError> {
        let bytes = fs::read(self.snapshot_dir(name).join("manifest"))?;
        SnapshotManifest::decode(&bytes)
    }
}

/// Write-to-temp, fsync, rename: the one place this crate performs a
/// non-staged-file atomic publish (`.regioninfo`, snapshot manifests).
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), RegionFsError> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
        f.write_all(bytes)?;
        f.flush()?;
        f.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests;

//! The node-level region manifest: which encoded region names exist under
//! a `namespace/table`, and which column families each was opened with, so
//! [`crate::Node::open`] knows what to reopen on restart. Family names
//! have to live here rather than being inferred from a region's on-disk
//! layout — a family with nothing flushed or referenced yet leaves no
//! directory behind, and `Region::open`'s WAL replay needs every family's
//! `Store` already present to route replayed edits into. Each region's own
//! `.regioninfo` (written by `regionfs`) still holds the authoritative row
//! range; this file only adds what `.regioninfo` doesn't carry.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::EngineError;

const MANIFEST_FILENAME: &str = "REGIONS.manifest";
const MANIFEST_TMP_FILENAME: &str = "REGIONS.manifest.tmp";

#[derive(Debug, Clone)]
pub struct RegionManifestEntry {
    pub encoded_name: String,
    pub families: Vec<String>,
}

pub struct NodeManifest {
    path: PathBuf,
    pub entries: Vec<RegionManifestEntry>,
}

impl NodeManifest {
    /// Loads `root/data/<namespace>/<table>/REGIONS.manifest`, or starts
    /// empty if it doesn't exist yet (a brand new table).
    pub fn load_or_create(root: &Path, namespace: &str, table: &str) -> Result<Self, EngineError> {
        let dir = root.join("data").join(namespace).join(table);
        fs::create_dir_all(&dir)?;
        let path = dir.join(MANIFEST_FILENAME);

        if !path.exists() {
            return Ok(Self { path, entries: Vec::new() });
        }

        let file = std::fs::File::open(&path)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (encoded_name, families) = trimmed.split_once(':').unwrap_or((trimmed, ""));
            let families = families.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect();
            entries.push(RegionManifestEntry { encoded_name: encoded_name.to_string(), families });
        }
        Ok(Self { path, entries })
    }

    /// Adds or replaces the entry for `encoded_name` (does not save).
    pub fn add(&mut self, encoded_name: String, families: Vec<String>) {
        self.entries.retain(|e| e.encoded_name != encoded_name);
        self.entries.push(RegionManifestEntry { encoded_name, families });
    }

    /// Removes the entry for `encoded_name` if present (does not save).
    pub fn remove(&mut self, encoded_name: &str) {
        self.entries.retain(|e| e.encoded_name != encoded_name);
    }

    /// Persists the manifest: write to a `.tmp` file, fsync, rename over
    /// the existing file, mirroring the stage-then-rename discipline
    /// `regionfs` already uses for everything a reader can see.
    pub fn save(&self) -> Result<(), EngineError> {
        let tmp_path = self.path.with_file_name(MANIFEST_TMP_FILENAME);
        {
            let mut f = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
            writeln!(f, "# RiptideKV region manifest")?;
            writeln!(f, "# format: <encoded_name>:<family1>,<family2>,...")?;
            for entry in &self.entries {
                writeln!(f, "{}:{}", entry.encoded_name, entry.families.join(","))?;
            }
            f.flush()?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

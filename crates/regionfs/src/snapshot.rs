use crate::RegionFsError;

/// One SortedFile referenced (not copied) by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFileRef {
    pub region_encoded_name: String,
    pub family: String,
    pub file_name: String,
}

/// The manifest written under `snapshots/<name>/`: a table name plus the set
/// of files that made up the table at snapshot time. No data is copied —
/// restoring or cloning a snapshot means re-linking these references into a
/// new or existing region's family directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotManifest {
    pub name: String,
    pub table: String,
    pub files: Vec<SnapshotFileRef>,
}

impl SnapshotManifest {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("name:{}\n", self.name));
        out.push_str(&format!("table:{}\n", self.table));
        for f in &self.files {
            out.push_str(&format!("file:{}:{}:{}\n", f.region_encoded_name, f.family, f.file_name));
        }
        out.into_bytes()
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, RegionFsError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| RegionFsError::CorruptedSnapshot("not valid utf-8".into()))?;

        let mut name = None;
        let mut table = None;
        let mut files = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, rest) = line
                .split_once(':')
                .ok_or_else(|| RegionFsError::CorruptedSnapshot(format!("malformed line: {line}")))?;
            match key {
                "name" => name = Some(rest.to_string()),
                "table" => table = Some(rest.to_string()),
                "file" => {
                    let parts: Vec<&str> = rest.splitn(3, ':').collect();
                    let [region, family, file_name] = parts[..] else {
                        return Err(RegionFsError::CorruptedSnapshot(format!(
                            "malformed file entry: {rest}"
                        )));
                    };
                    files.push(SnapshotFileRef {
                        region_encoded_name: region.to_string(),
                        family: family.to_string(),
                        file_name: file_name.to_string(),
                    });
                }
                other => {
                    return Err(RegionFsError::CorruptedSnapshot(format!("unknown field: {other}")))
                }
            }
        }

        Ok(Self {
            name: name.ok_or_else(|| RegionFsError::CorruptedSnapshot("missing name".into()))?,
            table: table.ok_or_else(|| RegionFsError::CorruptedSnapshot("missing table".into()))?,
            files,
        })
    }
}

/// Durability level requested for one [`crate::WalWriter::append`] call.
///
/// The ack for a write must not precede the durability promised by its
/// level: `append` only returns once the level's guarantee holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Not written to the log at all. The caller still receives a sequence
    /// number; the region must track such writes itself (see
    /// `mutationsWithoutWALSize` in `membuffer`) since a crash loses them.
    SkipWal,
    /// Appended to the log's in-process buffer but not flushed to the OS.
    AsyncWal,
    /// Appended and flushed to the OS, with the data (and the metadata
    /// needed to read it back) synced to disk via `fsync`-equivalent.
    SyncWal,
    /// Appended and fully synced: data plus all file metadata.
    FsyncWal,
    /// Inherit whatever durability the column family configures as its
    /// default; never appears inside the log itself. Resolved via
    /// [`Durability::resolve`] before it reaches [`crate::WalWriter::append`].
    UseDefault,
}

impl Durability {
    /// Resolves `UseDefault` to `default`. `default` itself must already be
    /// a concrete level.
    #[must_use]
    pub fn resolve(self, default: Durability) -> Durability {
        debug_assert_ne!(default, Durability::UseDefault, "family default durability must be concrete");
        match self {
            Durability::UseDefault => default,
            other => other,
        }
    }

    #[must_use]
    pub fn is_concrete(self) -> bool {
        !matches!(self, Durability::UseDefault)
    }
}

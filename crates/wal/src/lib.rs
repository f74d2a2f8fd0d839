//! # WAL
//!
//! Crash-safe ordering and durability for mutations before they reach
//! `membuffer`. A node has a single WAL directory holding a sequence of
//! append-only segments (`<file_id>.wal`); every region sharing it gets its
//! own strictly increasing sequence space, so [`replay_dir`] can hand a
//! recovering node exactly the edits past each region's last flushed
//! sequence.

mod durability;
mod reader;
mod record;
mod roll;
mod writer;

pub use durability::Durability;
pub use reader::{replay_dir, replay_file, replay_path, ReplayedEntry};
pub use roll::{NoopRollListener, RollListener, RollPolicy};
pub use writer::{segment_path, RolledSegment, WalWriter};

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt WAL record")]
    Corrupt,
    #[error("cell codec error: {0}")]
    Cell(#[from] keycodec::CorruptEncoding),
    #[error("region {region_id} has not yet appended sequence {sequence}")]
    NotYetAppended { region_id: u64, sequence: u64 },
}

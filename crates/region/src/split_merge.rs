//! Two-phase split/merge transactions (design note "split/merge
//! as two-phase transactions with an explicit point-of-no-return"). Both
//! transactions do all their fallible filesystem work — writing daughter
//! `.regioninfo` files and reference-file markers — before flipping this
//! region's own state past the PONR; any failure up to that point rolls
//! back to `Open` and leaves no partial daughter state for a reader to see,
//! since every visible write on the daughter side goes through
//! [`regionfs::RegionFileSystem`]'s atomic stage/rename discipline.
//!
//! Restoring the live [`store::ReferenceFile`] handles a daughter/merged
//! store needs is done here, directly from this region's currently open
//! [`store::Store`]s (`file_handles()`), not by re-parsing the `.ref`
//! marker files `create_reference_file` leaves on disk — recovering those
//! handles after a full process restart is left to the future node-level
//! recovery path (an open question, not solved by this crate).

use regionfs::{ReferenceSide, RegionInfo};

use crate::{Region, RegionError, RegionState};

/// The two daughter descriptors a completed split produced. The caller
/// (typically the node-level orchestrator) is responsible for actually
/// opening each daughter as its own [`Region`].
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub bottom: RegionInfo,
    pub top: RegionInfo,
}

/// The merged region descriptor a completed merge produced.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: RegionInfo,
}

impl Region {
    /// Splits this region at `split_key` into a bottom daughter
    /// (`[start_key, split_key)`) and a top daughter (`[split_key,
    /// end_key)`). Flushes every store first so the reference files cover
    /// everything durable; membuffer contents are not split, only files.
    #[allow(clippy::too_many_arguments)]
    pub fn split(
        &self,
        split_key: Vec<u8>,
        bottom_region_id: u64,
        bottom_encoded_name: String,
        top_region_id: u64,
        top_encoded_name: String,
    ) -> Result<SplitOutcome, RegionError> {
        self.transition(RegionState::Splitting)?;

        match self.split_inner(split_key, bottom_region_id, bottom_encoded_name, top_region_id, top_encoded_name) {
            Ok(outcome) => {
                *self.state.write() = RegionState::Split;
                self.observers.run(|o, ctx| o.post_split_after_ponr(ctx, self.region_id))?;
                Ok(outcome)
            }
            Err(e) => {
                *self.state.write() = RegionState::Open;
                let _ = self.observers.run(|o, ctx| o.post_split_rollback(ctx, self.region_id));
                Err(e)
            }
        }
    }

    fn split_inner(
        &self,
        split_key: Vec<u8>,
        bottom_region_id: u64,
        bottom_encoded_name: String,
        top_region_id: u64,
        top_encoded_name: String,
    ) -> Result<SplitOutcome, RegionError> {
        self.observers.run(|o, ctx| o.pre_split_before_ponr(ctx, self.region_id, &split_key))?;

        let info = self.info.read().clone();
        if split_key <= info.start_key || (!info.end_key.is_empty() && split_key >= info.end_key) {
            return Err(RegionError::InvalidSplitKey(format!(
                "{split_key:?} is not strictly between start {:?} and end {:?}",
                info.start_key, info.end_key
            )));
        }

        self.flush()?;

        let bottom_fs = self.fs.for_sibling(bottom_encoded_name.clone());
        let top_fs = self.fs.for_sibling(top_encoded_name.clone());

        let bottom_info = RegionInfo {
            namespace: info.namespace.clone(),
            table: info.table.clone(),
            region_encoded_name: bottom_encoded_name,
            region_id: bottom_region_id,
            start_key: info.start_key.clone(),
            end_key: split_key.clone(),
        };
        let top_info = RegionInfo {
            namespace: info.namespace.clone(),
            table: info.table.clone(),
            region_encoded_name: top_encoded_name,
            region_id: top_region_id,
            start_key: split_key.clone(),
            end_key: info.end_key.clone(),
        };

        bottom_fs.write_region_info(&bottom_info)?;
        top_fs.write_region_info(&top_info)?;

        let stores = self.stores.read();
        for (family, store) in stores.iter() {
            for handle in store.file_handles() {
                bottom_fs.create_reference_file(family, handle.file_id(), ReferenceSide::Bottom)?;
                top_fs.create_reference_file(family, handle.file_id(), ReferenceSide::Top)?;
            }
        }
        drop(stores);

        Ok(SplitOutcome { bottom: bottom_info, top: top_info })
    }

    /// Merges `other` into this region, producing one descriptor spanning
    /// both row ranges. Both regions must be adjacent (one's `end_key`
    /// equal to the other's `start_key`); which one is "self" vs. "other"
    /// does not need to match row order.
    pub fn merge(&self, other: &Region, merged_region_id: u64, merged_encoded_name: String) -> Result<MergeOutcome, RegionError> {
        self.transition(RegionState::Merging)?;
        if other.transition(RegionState::Merging).is_err() {
            *self.state.write() = RegionState::Open;
            return Err(RegionError::MergeRegion(format!("region {} is not open", other.region_id)));
        }

        match self.merge_inner(other, merged_region_id, merged_encoded_name) {
            Ok(outcome) => {
                *self.state.write() = RegionState::Merged;
                *other.state.write() = RegionState::Merged;
                self.observers.run(|o, ctx| o.post_merge_after_ponr(ctx, merged_region_id))?;
                Ok(outcome)
            }
            Err(e) => {
                *self.state.write() = RegionState::Open;
                *other.state.write() = RegionState::Open;
                let _ = self.observers.run(|o, ctx| o.post_merge_rollback(ctx, self.region_id, other.region_id));
                Err(e)
            }
        }
    }

    fn merge_inner(&self, other: &Region, merged_region_id: u64, merged_encoded_name: String) -> Result<MergeOutcome, RegionError> {
        self.observers.run(|o, ctx| o.pre_merge_before_ponr(ctx, self.region_id, other.region_id))?;

        let a = self.info.read().clone();
        let b = other.info.read().clone();
        let (lower, upper) = if a.end_key == b.start_key {
            (a, b)
        } else if b.end_key == a.start_key {
            (b, a)
        } else {
            return Err(RegionError::MergeRegion(format!("regions {} and {} are not adjacent", self.region_id, other.region_id)));
        };

        self.flush()?;
        other.flush()?;

        let merged_fs = self.fs.for_sibling(merged_encoded_name.clone());
        let merged_info = RegionInfo {
            namespace: lower.namespace.clone(),
            table: lower.table.clone(),
            region_encoded_name: merged_encoded_name,
            region_id: merged_region_id,
            start_key: lower.start_key,
            end_key: upper.end_key,
        };
        merged_fs.write_region_info(&merged_info)?;

        let (lower_region, upper_region): (&Region, &Region) =
            if lower.region_id == self.region_id { (self, other) } else { (other, self) };

        for (region, side) in [(lower_region, ReferenceSide::Bottom), (upper_region, ReferenceSide::Top)] {
            let stores = region.stores.read();
            for (family, store) in stores.iter() {
                for handle in store.file_handles() {
                    merged_fs.create_reference_file(family, handle.file_id(), side)?;
                }
            }
        }

        Ok(MergeOutcome { merged: merged_info })
    }
}


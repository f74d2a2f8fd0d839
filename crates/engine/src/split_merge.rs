//! Node-level split/merge: the half `region::split_merge` deliberately
//! leaves to "the future node-level recovery path" — opening each
//! daughter/merged region as a live [`Region`], and restoring the
//! [`store::ReferenceFile`] handles it needs directly from the parent's
//! still-open stores, since a freshly opened daughter starts with none.

use std::sync::Arc;

use keycodec::{Cell, CellType};
use region::Region;
use store::ReferenceFile;

use crate::{EngineError, Node};

#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub region_id: u64,
    pub split_key: Vec<u8>,
    pub bottom_region_id: u64,
    pub bottom_encoded_name: String,
    pub top_region_id: u64,
    pub top_encoded_name: String,
}

#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub region_a_id: u64,
    pub region_b_id: u64,
    pub merged_region_id: u64,
    pub merged_encoded_name: String,
}

fn boundary_cell(row: Vec<u8>) -> Cell {
    Cell::new(row, Vec::new(), Vec::new(), 0, CellType::Put, Vec::new())
}

impl Node {
    /// Splits `request.region_id` at `split_key`, opens both daughters, and
    /// restores each family's reference to the parent's on-disk files —
    /// the parent's own `store::Store`s never get split, only referenced.
    pub fn split(&self, request: SplitRequest) -> Result<(Arc<Region>, Arc<Region>), EngineError> {
        let parent = self.region(request.region_id)?;
        let family_names = parent.family_names();

        let outcome = parent.split(
            request.split_key.clone(),
            request.bottom_region_id,
            request.bottom_encoded_name,
            request.top_region_id,
            request.top_encoded_name,
        )?;

        let bottom = self.open_one_region(&outcome.bottom.region_encoded_name, outcome.bottom.clone(), &family_names)?;
        let top = self.open_one_region(&outcome.top.region_encoded_name, outcome.top.clone(), &family_names)?;

        let boundary = boundary_cell(request.split_key);
        for family in &family_names {
            for handle in parent.file_handles(family)? {
                bottom.add_reference(family, ReferenceFile { parent: handle.clone(), boundary: boundary.clone(), top: false })?;
                top.add_reference(family, ReferenceFile { parent: handle, boundary: boundary.clone(), top: true })?;
            }
        }

        let mut manifest = self.manifest.lock();
        manifest.remove(&parent.info().region_encoded_name);
        manifest.add(outcome.bottom.region_encoded_name.clone(), family_names.clone());
        manifest.add(outcome.top.region_encoded_name.clone(), family_names);
        manifest.save()?;
        drop(manifest);

        let mut regions = self.regions.write();
        regions.remove(&request.region_id);
        regions.insert(request.bottom_region_id, bottom.clone());
        regions.insert(request.top_region_id, top.clone());
        drop(regions);

        Ok((bottom, top))
    }

    /// Merges two adjacent regions into one, opens the merged region, and
    /// restores references to both parents' on-disk files, scoped to
    /// whichever side of the merge boundary each parent's rows sit on.
    pub fn merge(&self, request: MergeRequest) -> Result<Arc<Region>, EngineError> {
        let a = self.region(request.region_a_id)?;
        let b = self.region(request.region_b_id)?;

        let a_info = a.info();
        let b_info = b.info();
        let (lower, lower_region, upper_region) = if a_info.end_key == b_info.start_key {
            (a_info, &a, &b)
        } else if b_info.end_key == a_info.start_key {
            (b_info, &b, &a)
        } else {
            return Err(EngineError::Region(region::RegionError::MergeRegion(format!(
                "regions {} and {} are not adjacent",
                request.region_a_id, request.region_b_id
            ))));
        };
        let boundary_key = lower.end_key.clone();

        let mut family_names = a.family_names();
        for name in b.family_names() {
            if !family_names.contains(&name) {
                family_names.push(name);
            }
        }

        let outcome = a.merge(&b, request.merged_region_id, request.merged_encoded_name)?;
        let merged = self.open_one_region(&outcome.merged.region_encoded_name, outcome.merged.clone(), &family_names)?;

        let boundary = boundary_cell(boundary_key);
        for family in &family_names {
            if let Ok(handles) = lower_region.file_handles(family) {
                for handle in handles {
                    merged.add_reference(family, ReferenceFile { parent: handle, boundary: boundary.clone(), top: false })?;
                }
            }
            if let Ok(handles) = upper_region.file_handles(family) {
                for handle in handles {
                    merged.add_reference(family, ReferenceFile { parent: handle, boundary: boundary.clone(), top: true })?;
                }
            }
        }

        let mut manifest = self.manifest.lock();
        manifest.remove(&a.info().region_encoded_name);
        manifest.remove(&b.info().region_encoded_name);
        manifest.add(outcome.merged.region_encoded_name.clone(), family_names);
        manifest.save()?;
        drop(manifest);

        let mut regions = self.regions.write();
        regions.remove(&request.region_a_id);
        regions.remove(&request.region_b_id);
        regions.insert(request.merged_region_id, merged.clone());
        drop(regions);

        Ok(merged)
    }
}

//! Read path: `get()` and `scan()`, both plain lookups on the target
//! region — there is no node-level caching or merging beyond what
//! `region::Region` already does across its stores.

use keycodec::Cell;
use region::{RegionScanner, ScanRequest};

use crate::{EngineError, Node};

impl Node {
    pub fn get(&self, region_id: u64, target: &Cell, max_versions: u32) -> Result<Vec<Cell>, EngineError> {
        let region = self.region(region_id)?;
        Ok(region.get(target, max_versions)?)
    }

    pub fn exists(&self, region_id: u64, target: &Cell) -> Result<bool, EngineError> {
        let region = self.region(region_id)?;
        Ok(region.exists(target)?)
    }

    pub fn scan(&self, region_id: u64, request: ScanRequest, now_ts: u64) -> Result<RegionScanner, EngineError> {
        let region = self.region(region_id)?;
        Ok(region.scan(request, now_ts)?)
    }
}

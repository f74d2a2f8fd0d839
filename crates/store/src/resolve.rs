use keycodec::{Cell, CellType};

/// Resolves a mixed bag of raw cells (possibly from several sources) into
/// the set a caller should actually see: applies the version horizon
/// (`max_versions`), TTL expiry, and delete-tombstone propagation (§4.7):
/// a Delete-Cell removes the put with the exact same timestamp, a
/// Delete-Column removes puts at or below its timestamp, and a
/// Delete-Family removes every put in the family at or below its timestamp.
///
/// `now_ts` is the current time (same unit as cell timestamps) used for TTL
/// expiry; `drop_tombstones` discards tombstones from the output once
/// they've done their shadowing work (set for a scan, or a major compaction
/// that includes every file) rather than retaining them to shadow a file
/// that isn't part of this merge.
///
/// Shared by [`crate::Store::scan`] and [`crate::Store::compact`], since
/// both need the identical shadowing rules over a merged, sorted cell run.
pub fn resolve(mut cells: Vec<Cell>, max_versions: u32, ttl_seconds: Option<u64>, now_ts: u64, drop_tombstones: bool) -> Vec<Cell> {
    cells.sort_by(keycodec::compare);

    let mut out = Vec::new();
    let mut i = 0;
    while i < cells.len() {
        let row = cells[i].row.clone();
        let family = cells[i].family.clone();
        let mut j = i;
        let mut family_floor = 0u64;
        let mut family_version_deletes: Vec<u64> = Vec::new();
        while j < cells.len() && cells[j].row == row && cells[j].family == family {
            if cells[j].cell_type.is_delete_family() {
                family_floor = family_floor.max(cells[j].timestamp);
            }
            if cells[j].cell_type.is_delete_family_version() {
                family_version_deletes.push(cells[j].timestamp);
            }
            j += 1;
        }

        let mut k = i;
        while k < j {
            let qualifier = cells[k].qualifier.clone();
            let mut m = k;
            let mut column_floor = 0u64;
            let mut exact_deletes: Vec<u64> = Vec::new();
            while m < j && cells[m].qualifier == qualifier {
                if cells[m].cell_type.is_delete_column() {
                    column_floor = column_floor.max(cells[m].timestamp);
                }
                if cells[m].cell_type == CellType::DeleteCell {
                    exact_deletes.push(cells[m].timestamp);
                }
                m += 1;
            }

            let mut kept_versions = 0u32;
            for cell in &cells[k..m] {
                if cell.cell_type == CellType::Put {
                    let shadowed = cell.timestamp <= family_floor
                        || cell.timestamp <= column_floor
                        || family_version_deletes.contains(&cell.timestamp)
                        || exact_deletes.contains(&cell.timestamp);
                    let expired = ttl_seconds.is_some_and(|ttl| now_ts.saturating_sub(cell.timestamp) > ttl);
                    if shadowed || expired || kept_versions >= max_versions {
                        continue;
                    }
                    kept_versions += 1;
                    out.push(cell.clone());
                } else if !drop_tombstones {
                    out.push(cell.clone());
                }
            }
            k = m;
        }
        i = j;
    }
    out
}

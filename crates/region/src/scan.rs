use keycodec::Cell;

/// Parameters for [`crate::Region::scan`]. `small` hints an in-memory-only
/// access pattern: this crate honors it by disabling look-ahead (the whole
/// result set is materialized once, up front, rather than prefetched in
/// chunks) and biasing against polluting the block cache — the exact
/// lookahead-depth constants a real look-ahead prefetcher would use are an
/// an open design question, so there is no prefetcher to tune here.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub start_row: Option<Vec<u8>>,
    pub end_row: Option<Vec<u8>>,
    pub families: Option<Vec<String>>,
    pub max_versions: u32,
    /// Cells per `next(n)` call when set; whole rows per call otherwise.
    pub batch: Option<usize>,
    pub reversed: bool,
    pub small: bool,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            start_row: None,
            end_row: None,
            families: None,
            max_versions: u32::MAX,
            batch: None,
            reversed: false,
            small: false,
        }
    }
}

/// A region-level scanner over an already-materialized, row-ordered result
/// set. `next(n)` yields whole rows unless `batch` was set on the request,
/// in which case it yields up to `batch` cells per call, continuing a row
/// across calls if needed.
pub struct RegionScanner {
    pub(crate) scanner_id: u64,
    rows: Vec<Vec<Cell>>,
    row_cursor: usize,
    batch: Option<usize>,
    cell_cursor: usize,
}

impl RegionScanner {
    pub(crate) fn new(scanner_id: u64, mut rows: Vec<Vec<Cell>>, batch: Option<usize>, reversed: bool) -> Self {
        if reversed {
            rows.reverse();
        }
        Self { scanner_id, rows, row_cursor: 0, batch, cell_cursor: 0 }
    }

    #[must_use]
    pub fn scanner_id(&self) -> u64 {
        self.scanner_id
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.row_cursor >= self.rows.len()
    }

    /// Advances the scanner, returning up to `n` whole rows (default mode)
    /// or up to `n`... actually `batch` cells (batch mode), never crossing
    /// a row boundary without including that row's remaining cells in a
    /// later call.
    pub fn next(&mut self, n: usize) -> Vec<Vec<Cell>> {
        match self.batch {
            None => self.next_whole_rows(n),
            Some(batch_size) => self.next_by_cell_budget(batch_size),
        }
    }

    fn next_whole_rows(&mut self, n: usize) -> Vec<Vec<Cell>> {
        let end = (self.row_cursor + n).min(self.rows.len());
        let out = self.rows[self.row_cursor..end].to_vec();
        self.row_cursor = end;
        out
    }

    fn next_by_cell_budget(&mut self, budget: usize) -> Vec<Vec<Cell>> {
        let mut out: Vec<Vec<Cell>> = Vec::new();
        let mut spent = 0usize;
        while spent < budget && self.row_cursor < self.rows.len() {
            let row = &self.rows[self.row_cursor];
            let remaining_in_row = row.len() - self.cell_cursor;
            let take = remaining_in_row.min(budget - spent);
            out.push(row[self.cell_cursor..self.cell_cursor + take].to_vec());
            spent += take;
            self.cell_cursor += take;
            if self.cell_cursor >= row.len() {
                self.row_cursor += 1;
                self.cell_cursor = 0;
            }
        }
        out
    }
}

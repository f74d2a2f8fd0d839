/// A region's lifecycle state. `Split` and `Merged` are
/// terminal: no further transition is legal, and the catalog (external to
/// this crate) is responsible for tracking the successor region(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Opening,
    Open,
    Closing,
    Closed,
    Splitting,
    Split,
    Merging,
    Merged,
}

impl RegionState {
    /// `true` for the only state writes and reads are served from.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, RegionState::Open)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RegionState::Split | RegionState::Merged)
    }

    /// Validates `self -> next` against the region lifecycle's transition diagram.
    #[must_use]
    pub fn can_transition_to(self, next: RegionState) -> bool {
        use RegionState::*;
        matches!(
            (self, next),
            (Opening, Open)
                | (Open, Closing)
                | (Closing, Closed)
                | (Open, Splitting)
                | (Splitting, Split)
                | (Splitting, Open) // rollback before PONR
                | (Open, Merging)
                | (Merging, Merged)
                | (Merging, Open) // rollback before PONR
        )
    }
}

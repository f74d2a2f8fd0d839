/// Comparator for `checkAndMutate`, compared against the current cell's
/// value (`None` meaning "column absent").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparator {
    #[must_use]
    pub fn evaluate(self, current: Option<&[u8]>, expected: Option<&[u8]>) -> bool {
        match (current, expected) {
            (None, None) => matches!(self, Comparator::Equal | Comparator::LessOrEqual | Comparator::GreaterOrEqual),
            (None, Some(_)) | (Some(_), None) => matches!(self, Comparator::NotEqual),
            (Some(a), Some(b)) => match self {
                Comparator::Equal => a == b,
                Comparator::NotEqual => a != b,
                Comparator::Less => a < b,
                Comparator::LessOrEqual => a <= b,
                Comparator::Greater => a > b,
                Comparator::GreaterOrEqual => a >= b,
            },
        }
    }
}

/// One row's worth of atomic mutation, as submitted to [`crate::Region::batch`].
#[derive(Debug, Clone)]
pub struct RowMutation {
    pub row: Vec<u8>,
    pub cells: Vec<keycodec::Cell>,
    pub durability: wal::Durability,
}

/// Outcome of a single entry in a [`crate::Region::batch`] call: mutations
/// are per-row atomic, but a batch spanning many rows reports partial
/// failure per entry rather than aborting the whole call.
pub type BatchOutcome = Result<u64, crate::RegionError>;

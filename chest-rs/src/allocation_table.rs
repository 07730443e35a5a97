use crate::error::ChestError;

/// Decoded value of one allocation-table slot.
///
/// The legacy formats encode their sentinels as reserved integer values; the
/// table decodes those once at construction so a chain walk never compares
/// raw magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableValue {
    /// Link to the next block of the chain.
    Next(u32),
    /// Unused slot.
    Free,
    /// Chain terminator.
    EndOfChain,
}

/// Sentinel values a format supplies when building an allocation table.
///
/// Formats without a dedicated terminator leave `end_of_chain` unset and get
/// a synthetic terminator equal to the total block count instead.
#[derive(Debug, Clone, Copy)]
pub struct Sentinels {
    pub free: Option<u32>,
    pub end_of_chain: Option<u32>,
}

impl Sentinels {
    /// CFB FAT and mini-FAT sentinels.
    pub const CFB: Sentinels = Sentinels {
        free: Some(0xFFFF_FFFF),
        end_of_chain: Some(0xFFFF_FFFE),
    };

    /// No reserved values; the block count itself terminates a chain.
    pub const SYNTHETIC: Sentinels = Sentinels {
        free: None,
        end_of_chain: None,
    };
}

/// A fixed-size index-to-next-index mapping with reserved sentinel values.
pub struct AllocationTable {
    entries: Vec<TableValue>,
}

impl AllocationTable {
    /// Builds a table from raw slot values and the format's sentinels.
    ///
    /// Raw links pointing outside the table are kept as-is and reported as
    /// [`ChestError::MalformedChain`] if a chain walk ever reaches them.
    pub fn new(raw: &[u32], sentinels: Sentinels) -> Self {
        let count = raw.len() as u32;
        let entries = raw
            .iter()
            .map(|&value| {
                if Some(value) == sentinels.free {
                    TableValue::Free
                } else if Some(value) == sentinels.end_of_chain {
                    TableValue::EndOfChain
                } else if sentinels.end_of_chain.is_none() && value == count {
                    TableValue::EndOfChain
                } else {
                    TableValue::Next(value)
                }
            })
            .collect();
        AllocationTable { entries }
    }

    /// Follows the chain beginning at `start` to its terminal sentinel and
    /// returns the ordered block indices, starting with `start` itself.
    ///
    /// The walk is explicitly bounded: a link outside the table or a link
    /// back to an index already in the chain fails with
    /// [`ChestError::MalformedChain`] instead of looping, which the legacy
    /// formats do not guard against. A start index outside the table fails
    /// with [`ChestError::OutOfBounds`].
    pub fn resolve_chain(&self, start: u32) -> Result<Vec<u32>, ChestError> {
        let len = self.entries.len();
        if start as usize >= len {
            return Err(ChestError::OutOfBounds(format!(
                "chain start {start} outside table of {len} slots"
            )));
        }

        let mut chain = Vec::new();
        let mut visited = vec![false; len];
        let mut current = start;
        loop {
            if visited[current as usize] {
                return Err(ChestError::MalformedChain(format!(
                    "index {current} revisited; table contains a cycle"
                )));
            }
            visited[current as usize] = true;
            chain.push(current);
            match self.entries[current as usize] {
                TableValue::Free | TableValue::EndOfChain => break,
                TableValue::Next(next) => {
                    if next as usize >= len {
                        return Err(ChestError::MalformedChain(format!(
                            "link {next} from index {current} outside table of {len} slots"
                        )));
                    }
                    current = next;
                }
            }
        }
        Ok(chain)
    }
}

use crate::error::ChestError;

/// Translates block indices into absolute byte offsets in the source.
///
/// Two addressing rules exist across the supported formats: CFB places
/// sector `i` at `(i + 1) * sector_size` (the header occupies sector -1),
/// while GCF records a first-block offset and a fixed block size from which
/// a flat offset table is built once.
pub enum SectorMap {
    /// `offset = (index + 1) << sector_shift`.
    UniformStride { sector_shift: u8 },
    /// Flat lookup table of absolute offsets, one per block index.
    Precomputed { offsets: Vec<u64> },
}

impl SectorMap {
    pub fn uniform(sector_shift: u8) -> Self {
        SectorMap::UniformStride { sector_shift }
    }

    /// Builds the flat offset table from `first_block_offset + i * block_size`.
    pub fn precomputed(first_block_offset: u64, block_size: u64, block_count: u32) -> Self {
        let offsets = (0..block_count as u64)
            .map(|i| first_block_offset + i * block_size)
            .collect();
        SectorMap::Precomputed { offsets }
    }

    /// Absolute byte offset of one block index.
    ///
    /// Precomputed maps reject indices beyond the table; the final
    /// offset+length validation against end-of-source happens in
    /// [`crate::byte_source::ByteSource::read_range`].
    pub fn byte_offset(&self, index: u32) -> Result<u64, ChestError> {
        match self {
            SectorMap::UniformStride { sector_shift } => (index as u64 + 1)
                .checked_shl(*sector_shift as u32)
                .ok_or_else(|| {
                    ChestError::OutOfBounds(format!(
                        "sector shift {sector_shift} overflows offset arithmetic"
                    ))
                }),
            SectorMap::Precomputed { offsets } => {
                offsets.get(index as usize).copied().ok_or_else(|| {
                    ChestError::OutOfBounds(format!(
                        "block index {index} outside offset table of {} blocks",
                        offsets.len()
                    ))
                })
            }
        }
    }

    /// Translates a whole chain of indices into ordered byte offsets.
    pub fn chain_offsets(&self, chain: &[u32]) -> Result<Vec<u64>, ChestError> {
        chain.iter().map(|&index| self.byte_offset(index)).collect()
    }
}

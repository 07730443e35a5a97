use crate::allocation_table::{AllocationTable, Sentinels};
use crate::byte_source::ByteSource;
use crate::error::ChestError;
use crate::extract::Extract;
use crate::sector_map::SectorMap;
use log::debug;

/// Already-parsed CFB structures handed in by the caller.
///
/// This crate never parses raw header bytes; the caller materializes the
/// header fields, both FATs and the directory stream and hands them over as
/// this read-only model.
#[derive(Debug, Clone)]
pub struct CfbModel {
    /// Power-of-two exponent of the primary sector size.
    pub sector_shift: u8,
    /// Power-of-two exponent of the mini sector size.
    pub mini_sector_shift: u8,
    /// Streams of this size or less live in the mini stream.
    pub mini_stream_cutoff: u32,
    /// Raw primary FAT slot values.
    pub fat: Vec<u32>,
    /// Raw mini FAT slot values.
    pub mini_fat: Vec<u32>,
    /// Stream objects of the directory, in directory order.
    pub entries: Vec<CfbEntry>,
    /// First primary sector of the mini stream (the root entry's chain).
    pub mini_stream_start: u32,
    /// Total size of the mini stream in bytes.
    pub mini_stream_size: u64,
}

/// One stream object of a compound file.
#[derive(Debug, Clone)]
pub struct CfbEntry {
    /// Stream name; may carry `/` separators for storage hierarchy.
    pub name: String,
    /// First sector of the stream's chain, in whichever FAT its size selects.
    pub start_sector: u32,
    pub size: u64,
}

/// An open compound file.
///
/// The two allocation tables are fully decoupled: a stream either lives in
/// primary sectors addressed by `(index + 1) << sector_shift`, or, when its
/// size is at or below the mini-stream cutoff, in mini sectors addressed
/// inside the mini stream, which is itself one ordinary chain of primary
/// sectors and is materialized once when the archive is opened.
pub struct CfbArchive {
    source: ByteSource,
    sector_map: SectorMap,
    sector_shift: u8,
    mini_sector_shift: u8,
    mini_stream_cutoff: u32,
    fat: AllocationTable,
    mini_fat: AllocationTable,
    entries: Vec<CfbEntry>,
    mini_stream: Option<Vec<u8>>,
}

impl CfbArchive {
    /// Opens a compound file over `source`.
    ///
    /// Both sector shifts are validated here; real containers use single-digit
    /// shifts, and anything at 32 or above would overflow offset arithmetic.
    /// The mini stream is read through its primary-FAT chain here, so a
    /// corrupt root chain surfaces at open time rather than on first access.
    pub fn new(source: ByteSource, model: CfbModel) -> Result<Self, ChestError> {
        for shift in [model.sector_shift, model.mini_sector_shift] {
            if shift >= 32 {
                return Err(ChestError::InvalidData(format!(
                    "sector shift {shift} is outside the representable range"
                )));
            }
        }
        let mut archive = CfbArchive {
            source,
            sector_map: SectorMap::uniform(model.sector_shift),
            sector_shift: model.sector_shift,
            mini_sector_shift: model.mini_sector_shift,
            mini_stream_cutoff: model.mini_stream_cutoff,
            fat: AllocationTable::new(&model.fat, Sentinels::CFB),
            mini_fat: AllocationTable::new(&model.mini_fat, Sentinels::CFB),
            entries: model.entries,
            mini_stream: None,
        };
        if model.mini_stream_size > 0 {
            let bytes =
                archive.read_primary_chain(model.mini_stream_start, model.mini_stream_size)?;
            debug!("materialized mini stream: {} bytes", bytes.len());
            archive.mini_stream = Some(bytes);
        }
        Ok(archive)
    }

    /// Stream objects of the directory, in catalog order.
    pub fn entries(&self) -> &[CfbEntry] {
        &self.entries
    }

    /// Reads one stream object into memory, routing through the mini FAT for
    /// objects at or below the mini-stream cutoff and through the primary
    /// FAT otherwise.
    pub fn read_stream(&mut self, index: usize) -> Result<Vec<u8>, ChestError> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| ChestError::OutOfBounds(format!("no stream entry {index}")))?
            .clone();
        if entry.size <= self.mini_stream_cutoff as u64 {
            self.read_mini_chain(entry.start_sector, entry.size)
        } else {
            self.read_primary_chain(entry.start_sector, entry.size)
        }
    }

    /// Assembles `size` bytes by walking a primary-FAT chain sector by
    /// sector; the last sector is read partially.
    ///
    /// The declared size is format data and may be corrupt; it is checked
    /// against the resolved chain's capacity before any allocation sized by
    /// it happens.
    fn read_primary_chain(&mut self, start: u32, size: u64) -> Result<Vec<u8>, ChestError> {
        let chain = self.fat.resolve_chain(start)?;
        let sector_size = 1u64 << self.sector_shift;
        let capacity = (chain.len() as u64).saturating_mul(sector_size);
        if size > capacity {
            return Err(ChestError::MalformedChain(format!(
                "chain from sector {start} holds at most {capacity} bytes, stream declares {size}"
            )));
        }
        let mut out = Vec::with_capacity(size as usize);
        for offset in self.sector_map.chain_offsets(&chain)? {
            let remaining = size - out.len() as u64;
            if remaining == 0 {
                break;
            }
            let take = remaining.min(sector_size);
            let bytes = self.source.read_range(offset, take)?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Assembles `size` bytes by walking a mini-FAT chain; mini sector `i`
    /// is the slice of the mini stream starting at `i << mini_sector_shift`.
    fn read_mini_chain(&self, start: u32, size: u64) -> Result<Vec<u8>, ChestError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let stream = match &self.mini_stream {
            Some(stream) => stream.as_slice(),
            None => {
                return Err(ChestError::InvalidData(
                    "stream routed to the mini FAT but the file has no mini stream".to_string(),
                ))
            }
        };
        let chain = self.mini_fat.resolve_chain(start)?;
        let mini_size = 1usize << self.mini_sector_shift;
        let capacity = (chain.len() as u64).saturating_mul(mini_size as u64);
        if size > capacity {
            return Err(ChestError::MalformedChain(format!(
                "mini chain from sector {start} holds at most {capacity} bytes, stream declares {size}"
            )));
        }
        let mut out = Vec::with_capacity(size as usize);
        for &index in &chain {
            let remaining = size as usize - out.len();
            if remaining == 0 {
                break;
            }
            let take = remaining.min(mini_size);
            let pos = (index as usize) << self.mini_sector_shift;
            let end = pos + take;
            if end > stream.len() {
                return Err(ChestError::OutOfBounds(format!(
                    "mini sector {index} exceeds the {} byte mini stream",
                    stream.len()
                )));
            }
            out.extend_from_slice(&stream[pos..end]);
        }
        Ok(out)
    }
}

impl Extract for CfbArchive {
    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry_name(&self, index: usize) -> Option<String> {
        self.entries
            .get(index)
            .map(|entry| entry.name.clone())
            .filter(|name| !name.is_empty())
    }

    fn read_entry(&mut self, index: usize) -> Result<Vec<u8>, ChestError> {
        self.read_stream(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EOC: u32 = 0xFFFF_FFFE;
    const FREE: u32 = 0xFFFF_FFFF;

    /// Builds a little container: 64-byte sectors, 16-byte mini sectors,
    /// cutoff 32. Primary sectors 0 and 1 hold a large stream; sector 2 is
    /// the 64-byte mini stream, whose mini sectors 2 and 3 hold a small one.
    fn fixture() -> (ByteSource, CfbModel) {
        let sector_size = 64usize;
        let mut data = vec![0u8; (1 + 3) * sector_size];
        // Sector i sits at (i + 1) * 64.
        for i in 0..sector_size {
            data[sector_size + i] = 0xA0; // sector 0
            data[2 * sector_size + i] = 0xA1; // sector 1
            data[3 * sector_size + i] = i as u8; // sector 2: mini stream
        }
        let model = CfbModel {
            sector_shift: 6,
            mini_sector_shift: 4,
            mini_stream_cutoff: 32,
            fat: vec![1, EOC, EOC, FREE],
            mini_fat: vec![FREE, FREE, 3, EOC],
            entries: vec![
                CfbEntry {
                    name: "big.bin".to_string(),
                    start_sector: 0,
                    size: 65,
                },
                CfbEntry {
                    name: "small.bin".to_string(),
                    start_sector: 2,
                    size: 32,
                },
            ],
            mini_stream_start: 2,
            mini_stream_size: 64,
        };
        (ByteSource::from_buffer(data), model)
    }

    #[test]
    fn large_stream_reads_through_the_primary_fat() {
        let (source, model) = fixture();
        let mut archive = CfbArchive::new(source, model).unwrap();
        let bytes = archive.read_stream(0).unwrap();
        assert_eq!(bytes.len(), 65);
        assert!(bytes[..64].iter().all(|&b| b == 0xA0));
        assert_eq!(bytes[64], 0xA1);
    }

    #[test]
    fn small_stream_reads_through_the_mini_fat() {
        let (source, model) = fixture();
        let mut archive = CfbArchive::new(source, model).unwrap();
        let bytes = archive.read_stream(1).unwrap();
        // Mini sectors 2 and 3 of the mini stream: bytes 32..64.
        let expected: Vec<u8> = (32u8..64).collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn cutover_is_exactly_at_the_cutoff() {
        // A stream whose size equals the cutoff takes the mini rule; one
        // byte larger takes the primary rule.
        let (source, mut model) = fixture();
        model.entries.push(CfbEntry {
            name: "at-cutoff".to_string(),
            start_sector: 2,
            size: 32,
        });
        model.entries.push(CfbEntry {
            name: "above-cutoff".to_string(),
            start_sector: 0,
            size: 33,
        });
        let mut archive = CfbArchive::new(source, model).unwrap();

        let at_cutoff = archive.read_stream(2).unwrap();
        assert_eq!(at_cutoff, (32u8..64).collect::<Vec<u8>>());

        let above = archive.read_stream(3).unwrap();
        assert_eq!(above.len(), 33);
        assert!(above.iter().all(|&b| b == 0xA0));
    }

    #[test]
    fn tables_stay_decoupled() {
        // Mini sector 3 exists, primary sector 3 is FREE: routing the same
        // index through the wrong table must not resolve to the same bytes.
        let (source, mut model) = fixture();
        model.entries.push(CfbEntry {
            name: "mini-index-against-primary".to_string(),
            start_sector: 3,
            size: 40, // above cutoff: primary rule applies
        });
        let mut archive = CfbArchive::new(source, model).unwrap();
        // Sector 3 is a free slot; the chain ends immediately and cannot
        // satisfy 40 bytes.
        assert!(archive.read_stream(2).is_err());
    }

    #[test]
    fn chain_shorter_than_declared_size_fails() {
        let (source, mut model) = fixture();
        model.entries[0].size = 1000;
        let mut archive = CfbArchive::new(source, model).unwrap();
        assert!(matches!(
            archive.read_stream(0),
            Err(ChestError::MalformedChain(_))
        ));
    }

    #[test]
    fn absurd_declared_size_fails_instead_of_allocating() {
        // A corrupt size field must come back as an error before it can
        // drive an allocation.
        let (source, mut model) = fixture();
        model.entries[0].size = u64::MAX;
        let mut archive = CfbArchive::new(source, model).unwrap();
        assert!(matches!(
            archive.read_stream(0),
            Err(ChestError::MalformedChain(_))
        ));
    }

    #[test]
    fn oversized_sector_shifts_are_rejected_at_open() {
        let (source, mut model) = fixture();
        model.sector_shift = 64;
        assert!(matches!(
            CfbArchive::new(source, model),
            Err(ChestError::InvalidData(_))
        ));

        let (source, mut model) = fixture();
        model.mini_sector_shift = 33;
        assert!(CfbArchive::new(source, model).is_err());
    }

    #[test]
    fn corrupt_mini_stream_chain_fails_at_open() {
        let (source, mut model) = fixture();
        model.fat[2] = 2; // the mini stream's own chain now self-loops
        assert!(CfbArchive::new(source, model).is_err());
    }
}

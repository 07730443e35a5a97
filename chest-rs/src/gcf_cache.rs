use crate::allocation_table::{AllocationTable, Sentinels};
use crate::byte_source::ByteSource;
use crate::directory_tree::{build_catalog, BlockEntry, DirectoryNode, FileInfo};
use crate::error::ChestError;
use crate::extract::Extract;
use crate::sector_map::SectorMap;

/// Already-parsed GCF structures handed in by the caller.
#[derive(Debug, Clone)]
pub struct GcfModel {
    /// Absolute offset of data sector 0.
    pub first_block_offset: u64,
    /// Size of one data sector in bytes.
    pub block_size: u32,
    /// Total number of data sectors.
    pub block_count: u32,
    /// Raw sector allocation table; the value `block_count` terminates a
    /// chain (the format has no dedicated sentinel).
    pub fat: Vec<u32>,
    /// Directory forest, in node-table order.
    pub nodes: Vec<DirectoryNode>,
    /// Block-entry table the nodes' chains index into.
    pub block_entries: Vec<BlockEntry>,
}

/// An open game cache file.
///
/// Sector addressing is the precomputed rule: a flat offset table built once
/// from `first_block_offset + index * block_size`. The file catalog is
/// resolved from the directory forest when the cache is opened and never
/// recomputed.
pub struct GcfCache {
    source: ByteSource,
    sector_map: SectorMap,
    block_size: u32,
    fat: AllocationTable,
    /// Files discovered in the cache, with resolved paths and block lists.
    pub files: Vec<FileInfo>,
}

impl GcfCache {
    pub fn new(source: ByteSource, model: GcfModel) -> Self {
        let sector_map = SectorMap::precomputed(
            model.first_block_offset,
            model.block_size as u64,
            model.block_count,
        );
        let files = build_catalog(&model.nodes, &model.block_entries);
        GcfCache {
            source,
            sector_map,
            block_size: model.block_size,
            fat: AllocationTable::new(&model.fat, Sentinels::SYNTHETIC),
            files,
        }
    }

    /// Assembles one file's bytes from its block entries.
    ///
    /// Each entry's sector chain is resolved through the allocation table,
    /// read sector by sector, and placed at the entry's declared offset
    /// within the file image. A chain too short for its entry's size, or a
    /// run extending past the declared file size, fails the read. The
    /// declared size is format data and may be corrupt, so the file image is
    /// only allocated once the block entries account for it.
    pub fn read_file(&mut self, index: usize) -> Result<Vec<u8>, ChestError> {
        let info = self
            .files
            .get(index)
            .ok_or_else(|| ChestError::OutOfBounds(format!("no file {index}")))?
            .clone();
        let run_total: u64 = info.blocks.iter().map(|block| block.size as u64).sum();
        if info.size as u64 > run_total {
            return Err(ChestError::MalformedChain(format!(
                "block entries for {} hold {run_total} bytes, file declares {}",
                info.path, info.size
            )));
        }
        let mut out = vec![0u8; info.size as usize];
        for block in &info.blocks {
            let chain = self.fat.resolve_chain(block.first_sector)?;
            let mut written = 0u64;
            let mut file_pos = block.file_offset as u64;
            for &sector in &chain {
                if written >= block.size as u64 {
                    break;
                }
                let take = (block.size as u64 - written).min(self.block_size as u64);
                let offset = self.sector_map.byte_offset(sector)?;
                let bytes = self.source.read_range(offset, take)?;
                let start = file_pos as usize;
                let end = start + bytes.len();
                if end > out.len() {
                    return Err(ChestError::MalformedChain(format!(
                        "block run at {} extends past the {} byte file",
                        block.file_offset, info.size
                    )));
                }
                out[start..end].copy_from_slice(&bytes);
                file_pos += bytes.len() as u64;
                written += bytes.len() as u64;
            }
            if written < block.size as u64 {
                return Err(ChestError::MalformedChain(format!(
                    "sector chain from {} holds {written} bytes, block declares {}",
                    block.first_sector, block.size
                )));
            }
        }
        Ok(out)
    }
}

impl Extract for GcfCache {
    fn entry_count(&self) -> usize {
        self.files.len()
    }

    fn entry_name(&self, index: usize) -> Option<String> {
        self.files
            .get(index)
            .map(|info| info.path.clone())
            .filter(|path| !path.is_empty())
    }

    fn read_entry(&mut self, index: usize) -> Result<Vec<u8>, ChestError> {
        self.read_file(index)
    }
}

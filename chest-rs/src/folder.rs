use crate::byte_source::ByteSource;
use crate::checksum;
use crate::codec::{CodecFactory, CompressionType};
use crate::error::ChestError;
use log::debug;

/// One data block of a folder: where its compressed bytes sit in the source
/// and how large they are, before and after decoding.
#[derive(Debug, Clone, Copy)]
pub struct DataBlock {
    /// Absolute offset of the block's compressed bytes in the source.
    pub data_offset: u64,
    pub compressed_len: u16,
    pub uncompressed_len: u16,
    /// Stored block checksum; zero means "not present, do not verify".
    pub checksum: u32,
}

/// A folder: one codec session over an ordered run of data blocks.
#[derive(Debug, Clone)]
pub struct Folder {
    pub compression: CompressionType,
    pub blocks: Vec<DataBlock>,
}

/// Decodes a whole folder into its uncompressed byte stream.
///
/// A single decoder state is created for the folder and fed every block in
/// ascending order. The sliding-window families (Quantum, LZX) carry their
/// dictionary across block boundaries inside that state, so the blocks are
/// never reordered or decoded concurrently. Any failure (unknown tag,
/// checksum mismatch, sizes inconsistent with the source) fails the whole
/// folder; no partial output is returned. The decoder state is dropped when
/// the folder is done.
pub fn decode_folder(
    source: &mut ByteSource,
    folder: &Folder,
    codecs: &dyn CodecFactory,
    verify_checksums: bool,
) -> Result<Vec<u8>, ChestError> {
    let mut decoder = codecs.create(folder.compression)?;
    let mut out = Vec::new();
    for (index, block) in folder.blocks.iter().enumerate() {
        let compressed = source.read_range(block.data_offset, block.compressed_len as u64)?;
        if verify_checksums {
            checksum::verify_block(
                block.checksum,
                &compressed,
                block.compressed_len,
                block.uncompressed_len,
            )
            .map_err(|e| ChestError::InvalidData(format!("block {index}: {e}")))?;
        }
        let decoded = decoder.decode_block(&compressed, block.uncompressed_len as usize)?;
        out.extend_from_slice(&decoded);
    }
    debug!(
        "decoded folder: {:?}, {} blocks, {} bytes",
        folder.compression,
        folder.blocks.len(),
        out.len()
    );
    Ok(out)
}

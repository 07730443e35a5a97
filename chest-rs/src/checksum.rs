use crate::error::ChestError;
use byteorder::{ByteOrder, LittleEndian};

/// XOR-folds `data` into `seed`: whole little-endian u32 words first, then
/// the 1-3 trailing bytes packed high-to-low into one word.
///
/// The legacy implementation expresses this fold recursively; the order here
/// is identical, which is a format-compatibility requirement and not an
/// implementation detail.
fn fold(data: &[u8], seed: u32) -> u32 {
    let mut csum = seed;
    let words = data.len() / 4;
    for word in 0..words {
        csum ^= LittleEndian::read_u32(&data[word * 4..word * 4 + 4]);
    }
    let mut tail = 0u32;
    for &byte in &data[words * 4..] {
        tail = (tail << 8) | byte as u32;
    }
    csum ^ tail
}

/// Computes the checksum a cabinet data block should carry: the fold of the
/// compressed bytes combined with the fold of the two length fields.
pub fn block_checksum(compressed: &[u8], compressed_len: u16, uncompressed_len: u16) -> u32 {
    let mut sizes = [0u8; 4];
    LittleEndian::write_u16(&mut sizes[0..2], compressed_len);
    LittleEndian::write_u16(&mut sizes[2..4], uncompressed_len);
    fold(&sizes, fold(compressed, 0))
}

/// Verifies a data block against its stored checksum.
///
/// A stored value of zero means the checksum is absent and the block is
/// accepted without verification. This is an independent step, callable
/// before a block is trusted, not something inlined into decode.
pub fn verify_block(
    stored: u32,
    compressed: &[u8],
    compressed_len: u16,
    uncompressed_len: u16,
) -> Result<(), ChestError> {
    if stored == 0 {
        return Ok(());
    }
    let actual = block_checksum(compressed, compressed_len, uncompressed_len);
    if actual != stored {
        return Err(ChestError::InvalidData(format!(
            "block checksum mismatch: stored {stored:#010x}, computed {actual:#010x}"
        )));
    }
    Ok(())
}

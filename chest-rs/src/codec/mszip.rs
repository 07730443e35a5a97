use crate::codec::FolderCodec;
use crate::error::ChestError;
use flate2::{Decompress, FlushDecompress, Status};

const SIGNATURE: [u8; 2] = [b'C', b'K'];
const WINDOW_SIZE: usize = 32 * 1024;

/// Deflate-family block decoder.
///
/// Each block is an independent raw-deflate stream behind a two-byte `CK`
/// signature and decodes into a fixed 32 KiB scratch window; no dictionary
/// state needs to survive across blocks for this family, so a fresh inflater
/// is used per block and only the scratch window is reused.
pub struct MsZipCodec {
    window: Vec<u8>,
}

impl MsZipCodec {
    pub fn new() -> Self {
        MsZipCodec {
            window: vec![0u8; WINDOW_SIZE],
        }
    }
}

impl Default for MsZipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderCodec for MsZipCodec {
    fn decode_block(
        &mut self,
        compressed: &[u8],
        uncompressed_len: usize,
    ) -> Result<Vec<u8>, ChestError> {
        if compressed.len() < SIGNATURE.len() || compressed[..2] != SIGNATURE {
            return Err(ChestError::InvalidData(
                "missing CK signature on MSZIP block".to_string(),
            ));
        }
        if uncompressed_len > self.window.len() {
            return Err(ChestError::InvalidData(format!(
                "MSZIP block declares {uncompressed_len} bytes, window is {WINDOW_SIZE}"
            )));
        }

        let input = &compressed[SIGNATURE.len()..];
        let mut inflater = Decompress::new(false);
        loop {
            let consumed = inflater.total_in() as usize;
            let produced = inflater.total_out() as usize;
            let status = inflater
                .decompress(
                    &input[consumed..],
                    &mut self.window[produced..],
                    FlushDecompress::Finish,
                )
                .map_err(|e| {
                    ChestError::InvalidData(format!("deflate error in MSZIP block: {e}"))
                })?;
            match status {
                Status::StreamEnd => break,
                Status::Ok => {
                    if inflater.total_in() as usize == consumed
                        && inflater.total_out() as usize == produced
                    {
                        return Err(ChestError::InvalidData(
                            "MSZIP block made no progress".to_string(),
                        ));
                    }
                }
                Status::BufError => {
                    return Err(ChestError::InvalidData(
                        "truncated or oversized MSZIP block".to_string(),
                    ))
                }
            }
        }

        let produced = inflater.total_out() as usize;
        if produced != uncompressed_len {
            return Err(ChestError::InvalidData(format!(
                "MSZIP block decoded to {produced} bytes, declared {uncompressed_len}"
            )));
        }
        Ok(self.window[..produced].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn mszip_block(payload: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::from(SIGNATURE), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decodes_a_block_to_its_declared_length() {
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let block = mszip_block(&payload);
        let mut codec = MsZipCodec::new();
        assert_eq!(codec.decode_block(&block, payload.len()).unwrap(), payload);
    }

    #[test]
    fn blocks_decode_independently() {
        let first: Vec<u8> = vec![0xAB; 300];
        let second: Vec<u8> = b"independent block".to_vec();
        let mut codec = MsZipCodec::new();
        codec.decode_block(&mszip_block(&first), first.len()).unwrap();
        assert_eq!(
            codec.decode_block(&mszip_block(&second), second.len()).unwrap(),
            second
        );
    }

    #[test]
    fn rejects_missing_signature() {
        let mut block = mszip_block(b"payload");
        block[0] = b'X';
        let mut codec = MsZipCodec::new();
        assert!(matches!(
            codec.decode_block(&block, 7),
            Err(ChestError::InvalidData(_))
        ));
    }

    #[test]
    fn rejects_declared_length_mismatch() {
        let block = mszip_block(b"four");
        let mut codec = MsZipCodec::new();
        assert!(codec.decode_block(&block, 5).is_err());
    }

    #[test]
    fn rejects_declared_length_beyond_window() {
        let block = mszip_block(b"x");
        let mut codec = MsZipCodec::new();
        assert!(codec.decode_block(&block, WINDOW_SIZE + 1).is_err());
    }
}

pub mod mszip;

use crate::error::ChestError;

const TYPE_MASK: u16 = 0x000F;
const TYPE_NONE: u16 = 0;
const TYPE_MSZIP: u16 = 1;
const TYPE_QUANTUM: u16 = 2;
const TYPE_LZX: u16 = 3;

/// Decoded compression tag of a folder.
///
/// The raw tag packs the codec family into the low four bits and the codec
/// parameters into the upper bits: the Quantum level and window and the LZX
/// window size travel inside the tag rather than beside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Blocks are stored uncompressed.
    Stored,
    /// Deflate-family blocks behind a two-byte `CK` signature.
    MsZip,
    /// Quantum with its level (bits 4-7) and window bits (bits 8-12).
    Quantum { level: u8, window_bits: u8 },
    /// LZX with its window bits (bits 8-12).
    Lzx { window_bits: u8 },
    /// A family this crate does not recognize; holds the raw tag.
    Unknown(u16),
}

impl CompressionType {
    /// Decodes a raw folder compression tag.
    pub fn from_raw(raw: u16) -> Self {
        match raw & TYPE_MASK {
            TYPE_NONE => CompressionType::Stored,
            TYPE_MSZIP => CompressionType::MsZip,
            TYPE_QUANTUM => CompressionType::Quantum {
                level: ((raw >> 4) & 0x0F) as u8,
                window_bits: ((raw >> 8) & 0x1F) as u8,
            },
            TYPE_LZX => CompressionType::Lzx {
                window_bits: ((raw >> 8) & 0x1F) as u8,
            },
            _ => CompressionType::Unknown(raw),
        }
    }
}

/// Per-folder decoder state.
///
/// One instance is created per folder and fed every block of that folder in
/// ascending order. The sliding-window families keep their dictionary inside
/// this state, so implementations must never be shared across folders.
pub trait FolderCodec {
    /// Decodes one block's compressed bytes, returning exactly
    /// `uncompressed_len` bytes of output.
    fn decode_block(
        &mut self,
        compressed: &[u8],
        uncompressed_len: usize,
    ) -> Result<Vec<u8>, ChestError>;
}

/// Creates decoder states for the codec families a caller supports.
///
/// The LZX and Quantum decoders are external services; a caller that has
/// them plugs in its own factory. [`DefaultCodecs`] covers the families this
/// crate decodes itself.
pub trait CodecFactory {
    fn create(&self, compression: CompressionType) -> Result<Box<dyn FolderCodec>, ChestError>;
}

/// Built-in factory: Stored and MSZIP.
pub struct DefaultCodecs;

impl CodecFactory for DefaultCodecs {
    fn create(&self, compression: CompressionType) -> Result<Box<dyn FolderCodec>, ChestError> {
        match compression {
            CompressionType::Stored => Ok(Box::new(StoredCodec)),
            CompressionType::MsZip => Ok(Box::new(mszip::MsZipCodec::new())),
            other => Err(ChestError::UnsupportedCodec(format!(
                "no decoder configured for {other:?}"
            ))),
        }
    }
}

/// Pass-through for uncompressed folders: block bytes are the output verbatim.
pub struct StoredCodec;

impl FolderCodec for StoredCodec {
    fn decode_block(
        &mut self,
        compressed: &[u8],
        _uncompressed_len: usize,
    ) -> Result<Vec<u8>, ChestError> {
        Ok(compressed.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_decodes_family_and_parameters() {
        assert_eq!(CompressionType::from_raw(0x0000), CompressionType::Stored);
        assert_eq!(CompressionType::from_raw(0x0001), CompressionType::MsZip);
        assert_eq!(
            CompressionType::from_raw(0x1503),
            CompressionType::Lzx { window_bits: 21 }
        );
        assert_eq!(
            CompressionType::from_raw(0x0A72),
            CompressionType::Quantum {
                level: 7,
                window_bits: 10
            }
        );
        assert_eq!(
            CompressionType::from_raw(0x000F),
            CompressionType::Unknown(0x000F)
        );
    }

    #[test]
    fn upper_bits_do_not_change_the_family() {
        // Window bits live above the family nibble; masking selects the family.
        assert_eq!(CompressionType::from_raw(0x1F01), CompressionType::MsZip);
    }

    #[test]
    fn default_factory_rejects_external_families() {
        assert!(DefaultCodecs
            .create(CompressionType::Lzx { window_bits: 15 })
            .is_err());
        assert!(DefaultCodecs
            .create(CompressionType::Quantum {
                level: 1,
                window_bits: 10
            })
            .is_err());
        assert!(DefaultCodecs.create(CompressionType::Stored).is_ok());
    }
}

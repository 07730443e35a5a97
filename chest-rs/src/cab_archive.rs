use crate::byte_source::ByteSource;
use crate::codec::{CodecFactory, DefaultCodecs};
use crate::error::ChestError;
use crate::extract::Extract;
use crate::folder::{decode_folder, Folder};
use std::collections::HashMap;

/// Already-parsed cabinet structures handed in by the caller.
pub struct CabModel {
    /// Folders, each with its compression tag and ordered data blocks.
    pub folders: Vec<Folder>,
    /// Files, each a slice of one folder's uncompressed stream.
    pub files: Vec<CabFileEntry>,
}

/// One file of a cabinet.
#[derive(Debug, Clone)]
pub struct CabFileEntry {
    pub name: String,
    /// Index of the folder holding the file's bytes.
    pub folder_index: u16,
    /// Offset of the file within the folder's uncompressed stream.
    pub folder_offset: u32,
    pub size: u32,
}

/// An open cabinet.
///
/// Folder-compressed addressing: a file's bytes are an offset+length slice
/// of its folder's uncompressed stream, so reading any file means decoding
/// that folder from block zero. A folder is decoded once per archive and the
/// result cached; the cache only ever holds fully decoded folders.
pub struct CabArchive {
    source: ByteSource,
    folders: Vec<Folder>,
    files: Vec<CabFileEntry>,
    codecs: Box<dyn CodecFactory>,
    verify_checksums: bool,
    decoded: HashMap<u16, Vec<u8>>,
}

impl CabArchive {
    /// Opens a cabinet with the built-in codecs (Stored, MSZIP).
    pub fn new(source: ByteSource, model: CabModel) -> Self {
        Self::with_codecs(source, model, Box::new(DefaultCodecs))
    }

    /// Opens a cabinet with a caller-supplied codec factory, for callers
    /// that bring LZX or Quantum decoders.
    pub fn with_codecs(
        source: ByteSource,
        model: CabModel,
        codecs: Box<dyn CodecFactory>,
    ) -> Self {
        CabArchive {
            source,
            folders: model.folders,
            files: model.files,
            codecs,
            verify_checksums: true,
            decoded: HashMap::new(),
        }
    }

    /// Enables or disables data-block checksum verification. Blocks whose
    /// stored checksum is zero are never verified either way.
    pub fn set_verify_checksums(&mut self, verify: bool) {
        self.verify_checksums = verify;
    }

    /// Files of the cabinet, in catalog order.
    pub fn files(&self) -> &[CabFileEntry] {
        &self.files
    }

    /// Decodes a folder on first use and returns its uncompressed stream.
    fn folder_bytes(&mut self, folder_index: u16) -> Result<&[u8], ChestError> {
        if !self.decoded.contains_key(&folder_index) {
            let folder = self.folders.get(folder_index as usize).ok_or_else(|| {
                ChestError::OutOfBounds(format!("no folder {folder_index}"))
            })?;
            let bytes = decode_folder(
                &mut self.source,
                folder,
                self.codecs.as_ref(),
                self.verify_checksums,
            )?;
            self.decoded.insert(folder_index, bytes);
        }
        match self.decoded.get(&folder_index) {
            Some(bytes) => Ok(bytes),
            None => Err(ChestError::InvalidData(format!(
                "folder {folder_index} missing from the decode cache"
            ))),
        }
    }

    /// Reads one file by slicing its folder's decoded stream.
    pub fn read_file(&mut self, index: usize) -> Result<Vec<u8>, ChestError> {
        let entry = self
            .files
            .get(index)
            .ok_or_else(|| ChestError::OutOfBounds(format!("no file {index}")))?
            .clone();
        let folder = self.folder_bytes(entry.folder_index)?;
        let start = entry.folder_offset as usize;
        let end = start
            .checked_add(entry.size as usize)
            .filter(|&end| end <= folder.len())
            .ok_or_else(|| {
                ChestError::OutOfBounds(format!(
                    "file {index} at {start}+{} extends past the {} byte folder stream",
                    entry.size,
                    folder.len()
                ))
            })?;
        Ok(folder[start..end].to_vec())
    }
}

impl Extract for CabArchive {
    fn entry_count(&self) -> usize {
        self.files.len()
    }

    fn entry_name(&self, index: usize) -> Option<String> {
        self.files
            .get(index)
            .map(|entry| entry.name.clone())
            .filter(|name| !name.is_empty())
    }

    fn read_entry(&mut self, index: usize) -> Result<Vec<u8>, ChestError> {
        self.read_file(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::block_checksum;
    use crate::codec::{CompressionType, FolderCodec, StoredCodec};
    use crate::folder::DataBlock;
    use std::cell::Cell;
    use std::rc::Rc;

    /// One stored folder of two blocks holding "hello, cabinet!" split 8/7,
    /// and two files slicing it.
    fn fixture() -> (ByteSource, CabModel) {
        let payload = b"hello, cabinet!";
        let (first, second) = payload.split_at(8);
        let mut data = Vec::new();
        let mut blocks = Vec::new();
        for part in [first, second] {
            blocks.push(DataBlock {
                data_offset: data.len() as u64,
                compressed_len: part.len() as u16,
                uncompressed_len: part.len() as u16,
                checksum: block_checksum(part, part.len() as u16, part.len() as u16),
            });
            data.extend_from_slice(part);
        }
        let model = CabModel {
            folders: vec![Folder {
                compression: CompressionType::Stored,
                blocks,
            }],
            files: vec![
                CabFileEntry {
                    name: "hello.txt".to_string(),
                    folder_index: 0,
                    folder_offset: 0,
                    size: 5,
                },
                CabFileEntry {
                    name: "cabinet.txt".to_string(),
                    folder_index: 0,
                    folder_offset: 7,
                    size: 8,
                },
            ],
        };
        (ByteSource::from_buffer(data), model)
    }

    #[test]
    fn files_slice_the_folder_stream() {
        let (source, model) = fixture();
        let mut archive = CabArchive::new(source, model);
        assert_eq!(archive.read_file(0).unwrap(), b"hello");
        assert_eq!(archive.read_file(1).unwrap(), b" cabinet");
    }

    #[test]
    fn file_past_the_folder_stream_fails() {
        let (source, mut model) = fixture();
        model.files[1].size = 100;
        let mut archive = CabArchive::new(source, model);
        assert!(matches!(
            archive.read_file(1),
            Err(ChestError::OutOfBounds(_))
        ));
    }

    #[test]
    fn bad_folder_index_fails() {
        let (source, mut model) = fixture();
        model.files[0].folder_index = 9;
        let mut archive = CabArchive::new(source, model);
        assert!(archive.read_file(0).is_err());
    }

    struct CountingFactory {
        created: Rc<Cell<usize>>,
    }

    impl CodecFactory for CountingFactory {
        fn create(
            &self,
            _compression: CompressionType,
        ) -> Result<Box<dyn FolderCodec>, ChestError> {
            self.created.set(self.created.get() + 1);
            Ok(Box::new(StoredCodec))
        }
    }

    #[test]
    fn a_folder_is_decoded_once() {
        let (source, model) = fixture();
        let created = Rc::new(Cell::new(0));
        let mut archive = CabArchive::with_codecs(
            source,
            model,
            Box::new(CountingFactory {
                created: Rc::clone(&created),
            }),
        );
        archive.read_file(0).unwrap();
        archive.read_file(1).unwrap();
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn checksum_verification_covers_folder_reads() {
        let (source, mut model) = fixture();
        model.folders[0].blocks[0].checksum ^= 1;
        let mut archive = CabArchive::new(source, model);
        assert!(archive.read_file(0).is_err());

        let (source, mut model) = fixture();
        model.folders[0].blocks[0].checksum ^= 1;
        let mut archive = CabArchive::new(source, model);
        archive.set_verify_checksums(false);
        assert!(archive.read_file(0).is_ok());
    }
}

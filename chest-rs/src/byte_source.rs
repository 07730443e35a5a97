use crate::error::ChestError;
use std::io::{Read, Seek, SeekFrom};

/// Combined bound for seekable stream backings.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

enum Backing {
    /// In-memory buffer; `base` is the index of the source's byte 0 within it.
    Buffer { data: Vec<u8>, base: u64 },
    /// Seekable stream; `len` is captured once when the source is created.
    Stream { reader: Box<dyn ReadSeek>, len: u64 },
}

/// Bounds-checked random-access reads over a byte buffer or a seekable stream.
///
/// Every read is validated against the source's total length before the
/// backing is touched; out-of-range requests are returned as errors, never
/// panics. Reads are explicit offset+length with no shared cursor, so no
/// bookkeeping survives between calls, and nothing is cached at this layer.
pub struct ByteSource {
    backing: Backing,
}

impl ByteSource {
    /// Creates a source over an in-memory buffer.
    pub fn from_buffer(data: Vec<u8>) -> Self {
        Self::from_buffer_at(data, 0)
    }

    /// Creates a source over an in-memory buffer whose logical byte 0 sits at
    /// `base` within the buffer. Bytes before `base` are not addressable.
    pub fn from_buffer_at(data: Vec<u8>, base: u64) -> Self {
        ByteSource {
            backing: Backing::Buffer { data, base },
        }
    }

    /// Creates a source over a seekable stream. The stream's length is
    /// captured here; the stream is owned for the source's lifetime and is
    /// not closed beyond being dropped.
    pub fn from_stream<R: Read + Seek + 'static>(mut reader: R) -> Result<Self, ChestError> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(ByteSource {
            backing: Backing::Stream {
                reader: Box::new(reader),
                len,
            },
        })
    }

    /// Total number of addressable bytes.
    pub fn len(&self) -> u64 {
        match &self.backing {
            Backing::Buffer { data, base } => (data.len() as u64).saturating_sub(*base),
            Backing::Stream { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `length` bytes starting at `offset`.
    ///
    /// Fails with [`ChestError::OutOfBounds`] when `length` is zero or when
    /// `offset + length` exceeds [`ByteSource::len`]; stream errors surface
    /// as [`ChestError::Io`].
    pub fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>, ChestError> {
        if length == 0 {
            return Err(ChestError::OutOfBounds(format!(
                "zero-length read at offset {offset}"
            )));
        }
        let end = offset.checked_add(length).ok_or_else(|| {
            ChestError::OutOfBounds(format!("read range {offset}+{length} overflows"))
        })?;
        if end > self.len() {
            return Err(ChestError::OutOfBounds(format!(
                "read range {offset}+{length} exceeds source length {}",
                self.len()
            )));
        }
        match &mut self.backing {
            Backing::Buffer { data, base } => {
                let start = (*base + offset) as usize;
                Ok(data[start..start + length as usize].to_vec())
            }
            Backing::Stream { reader, .. } => {
                reader.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; length as usize];
                reader.read_exact(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

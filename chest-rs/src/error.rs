/// Represents all possible errors that can occur in the chest library.
///
/// This enum is used throughout the crate to provide detailed error information
/// for operations that may fail, such as chain resolution, block decoding, and
/// I/O. At the public extraction boundary the detail is collapsed to a plain
/// pass/fail result; callers who need the detail use the lower-level APIs.
#[derive(Debug)]
pub enum ChestError {
    /// An offset or index fell outside the valid range of a table or source.
    OutOfBounds(String),
    /// A chain walk hit a sentinel-free dead end: an out-of-range link or a
    /// revisited index in the allocation table.
    MalformedChain(String),
    /// A folder carried a compression tag no configured codec can decode.
    UnsupportedCodec(String),
    /// Data failed validation (bad signature, size mismatch, checksum error).
    InvalidData(String),
    /// An error from the underlying stream or filesystem.
    Io(std::io::Error),
}

impl std::fmt::Display for ChestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChestError::OutOfBounds(err) => write!(f, "Out of bounds: {err}"),
            ChestError::MalformedChain(err) => write!(f, "Malformed chain: {err}"),
            ChestError::UnsupportedCodec(err) => write!(f, "Unsupported codec: {err}"),
            ChestError::InvalidData(err) => write!(f, "Invalid data: {err}"),
            ChestError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ChestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChestError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Allows automatic conversion from `std::io::Error` to `ChestError`.
impl From<std::io::Error> for ChestError {
    fn from(error: std::io::Error) -> Self {
        ChestError::Io(error)
    }
}

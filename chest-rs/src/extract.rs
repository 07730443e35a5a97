use crate::error::ChestError;
use log::warn;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Uniform extraction surface over every container wrapper.
///
/// Wrappers supply the catalog (`entry_count`, `entry_name`) and in-memory
/// reads (`read_entry`); the filesystem side is shared. All failure detail
/// is collapsed to pass/fail at this boundary and emitted through the `log`
/// facade instead.
pub trait Extract {
    /// Number of logical entries in the catalog.
    fn entry_count(&self) -> usize;

    /// Logical name (relative path) of an entry, if it has one.
    fn entry_name(&self, index: usize) -> Option<String>;

    /// Reads one entry's bytes into memory.
    fn read_entry(&mut self, index: usize) -> Result<Vec<u8>, ChestError>;

    /// Extracts one entry to a file under `out_dir`, creating any needed
    /// subdirectories. Entries without a name are written as `file{index}`.
    ///
    /// Returns `false`, without panicking and without creating the output
    /// file, on an invalid index, an empty entry, or a decode failure; an
    /// output I/O failure also returns `false` but may leave a partially
    /// written file behind.
    fn extract_entry(&mut self, index: usize, out_dir: &Path) -> bool {
        let bytes = match self.read_entry(index) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("entry {index}: {e}");
                return false;
            }
        };
        if bytes.is_empty() {
            warn!("entry {index}: empty entry, nothing to extract");
            return false;
        }
        let relative = match self.entry_name(index) {
            Some(name) if !name.is_empty() => name,
            _ => format!("file{index}"),
        };
        match write_entry(out_dir, &relative, &bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("entry {index} ({relative}): {e}");
                false
            }
        }
    }

    /// Extracts every entry, in catalog order, to `out_dir`.
    ///
    /// Every entry is attempted regardless of earlier failures; the return
    /// value only reports whether all of them succeeded.
    fn extract_all(&mut self, out_dir: &Path) -> bool {
        let mut all_ok = true;
        for index in 0..self.entry_count() {
            all_ok &= self.extract_entry(index, out_dir);
        }
        all_ok
    }
}

/// Writes one extracted entry under `out_dir` at its relative path.
///
/// Path components are sanitized so a hostile entry name cannot climb out of
/// the output directory; directory creation is idempotent.
fn write_entry(out_dir: &Path, relative: &str, bytes: &[u8]) -> Result<(), ChestError> {
    let mut target = PathBuf::from(out_dir);
    for part in relative.split(['/', '\\']) {
        if part.is_empty() || part == "." || part == ".." {
            continue;
        }
        target.push(part);
    }
    if target == out_dir {
        return Err(ChestError::InvalidData(format!(
            "entry name {relative:?} resolves to no file name"
        )));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&target)?;
    file.write_all(bytes)?;
    Ok(())
}

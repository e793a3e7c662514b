//! VirtualFileSystem trait definition

use crate::error::{VfsError, VfsResult};
use std::path::Path;

/// Read-only file access for script sources.
///
/// # Implementations
/// - `MemoryFileSystem`: in-memory files, used by tests and embedding hosts
/// - `NativeFileSystem`: the OS file system, optionally confined to a base directory
pub trait VirtualFileSystem: Send + Sync {
    /// Read raw file contents
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path exists and is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read a file as UTF-8 source text
    fn read_source(&self, path: &Path) -> VfsResult<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::InvalidUtf8 {
            path: path.to_string_lossy().replace('\\', "/"),
        })
    }
}

//! In-memory file system implementation

use crate::error::{VfsError, VfsResult};
use crate::path::to_key;
use crate::VirtualFileSystem;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// An in-memory file system.
///
/// Files live in a `BTreeMap` keyed by normalized path, so lookups through
/// `./` or `../` segments find the same entry. Clones share storage.
///
/// # Example
/// ```
/// use ebs_vfs::{MemoryFileSystem, VirtualFileSystem};
/// use std::path::Path;
///
/// let fs = MemoryFileSystem::new();
/// fs.insert("/app/main.ebs", "print 1;");
/// assert!(fs.is_file(Path::new("/app/./main.ebs")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFileSystem {
    /// Create a new empty memory file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new memory file system pre-populated with files.
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<[u8]>,
    {
        let fs = Self::new();
        for (path, content) in files {
            fs.insert(path.as_ref(), content);
        }
        fs
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let key = to_key(path.as_ref());
        // a poisoned lock only means another writer panicked; the map is still usable
        let mut files = match self.files.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        files.insert(key, content.as_ref().to_vec());
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VirtualFileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let key = to_key(path);
        let files = self.files.read().map_err(|_| VfsError::Io {
            message: String::from("Lock poisoned"),
        })?;

        files
            .get(&key)
            .cloned()
            .ok_or(VfsError::NotFound { path: key })
    }

    fn exists(&self, path: &Path) -> bool {
        let key = to_key(path);
        match self.files.read() {
            Ok(files) => files.contains_key(&key),
            Err(_) => false,
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        // no directory entries are stored
        self.exists(path)
    }
}

//! Native file system implementation

use crate::error::{VfsError, VfsResult};
use crate::path::normalize;
use crate::VirtualFileSystem;
use std::path::{Path, PathBuf};

/// The OS file system.
///
/// With a base directory every path is interpreted relative to it, and a
/// path that normalizes to somewhere outside the base is refused with
/// [`VfsError::PermissionDenied`].
#[derive(Debug, Clone, Default)]
pub struct NativeFileSystem {
    base: Option<PathBuf>,
}

impl NativeFileSystem {
    /// Create an unrestricted native file system.
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Create a native file system confined to `base`.
    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base: Some(normalize(base.as_ref())),
        }
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Map a requested path onto the real file system.
    fn real_path(&self, path: &Path) -> VfsResult<PathBuf> {
        let Some(base) = &self.base else {
            return Ok(path.to_path_buf());
        };

        let relative = path.strip_prefix("/").unwrap_or(path);
        let joined = normalize(&base.join(relative));
        if joined.starts_with(base) {
            Ok(joined)
        } else {
            Err(VfsError::PermissionDenied {
                path: path.to_string_lossy().into_owned(),
            })
        }
    }
}

impl VirtualFileSystem for NativeFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let real = self.real_path(path)?;
        std::fs::read(&real).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound {
                path: path.to_string_lossy().into_owned(),
            },
            std::io::ErrorKind::PermissionDenied => VfsError::PermissionDenied {
                path: path.to_string_lossy().into_owned(),
            },
            _ => e.into(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.real_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.real_path(path).map(|p| p.is_file()).unwrap_or(false)
    }
}

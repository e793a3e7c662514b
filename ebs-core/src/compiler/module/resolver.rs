//! Module resolver
//!
//! Turns `import "path";` into a parsed [`Program`].
//!
//! # Resolution rules
//! - The path is relative to the directory of the importing file, or to the
//!   root directory when there is no importing file (inline source).
//! - `.`/`..` collapse lexically; spaces and subdirectories are fine.
//! - A path without an extension also tries `<path>.ebs`.
//! - Each resolved path is imported at most once per run.

use ebs_vfs::path::{normalize, to_key};
use ebs_vfs::{VfsError, VirtualFileSystem};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::compiler::parser::{parse_program, Program};
use crate::runtime::error::{ErrorKind, RuntimeError};

const TARGET: &str = "ebs::module";

/// Default script extension
pub const SCRIPT_EXTENSION: &str = "ebs";

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    NotFound {
        import_path: String,
        tried: Vec<PathBuf>,
    },
    ReadError {
        path: PathBuf,
        message: String,
    },
    ParseError {
        path: PathBuf,
        message: String,
    },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::NotFound { import_path, tried } => {
                write!(f, "Import file not found: '{import_path}'")?;
                if !tried.is_empty() {
                    write!(f, " (tried:")?;
                    for path in tried {
                        write!(f, " {}", to_key(path))?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            ResolveError::ReadError { path, message } => {
                write!(f, "Failed to read import file '{}': {}", to_key(path), message)
            }
            ResolveError::ParseError { path, message } => {
                write!(f, "Failed to parse import file '{}': {}", to_key(path), message)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

impl ResolveError {
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound { .. } => ErrorKind::NotFoundError,
            ResolveError::ReadError { .. } => ErrorKind::IoError,
            ResolveError::ParseError { .. } => ErrorKind::ParseError,
        }
    }
}

impl From<ResolveError> for RuntimeError {
    fn from(err: ResolveError) -> Self {
        RuntimeError::new(err.error_kind(), err.to_string())
    }
}

pub struct ModuleResolver {
    vfs: Box<dyn VirtualFileSystem>,
    root_dir: PathBuf,
    /// Parsed programs by resolved path
    cache: HashMap<String, Rc<Program>>,
    /// Resolved paths already imported in this run
    imported: HashSet<String>,
}

impl ModuleResolver {
    pub fn new(vfs: Box<dyn VirtualFileSystem>, root_dir: impl AsRef<Path>) -> Self {
        Self {
            vfs,
            root_dir: normalize(root_dir.as_ref()),
            cache: HashMap::new(),
            imported: HashSet::new(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Resolve `import_path` against the importing file's directory
    pub fn resolve_import(&self, current_file: Option<&Path>, import_path: &str) -> PathBuf {
        let unified = import_path.trim().replace('\\', "/");
        let requested = Path::new(&unified);
        if requested.is_absolute() {
            return normalize(requested);
        }
        let base = current_file
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root_dir.clone());
        normalize(&base.join(requested))
    }

    /// Record `path` as imported; `false` when it already was
    pub fn mark_imported(&mut self, path: &Path) -> bool {
        self.imported.insert(to_key(path))
    }

    pub fn is_imported(&self, path: &Path) -> bool {
        self.imported.contains(&to_key(path))
    }

    /// Forget the imported set; parsed programs stay cached
    pub fn reset_imports(&mut self) {
        self.imported.clear();
    }

    /// Find, read and parse the file for an import. Returns the path that
    /// actually matched, which may carry an added extension.
    pub fn load(
        &mut self,
        current_file: Option<&Path>,
        import_path: &str,
    ) -> Result<(PathBuf, Rc<Program>), ResolveError> {
        let resolved = self.resolve_import(current_file, import_path);
        let mut tried = Vec::new();

        for candidate in self.candidates(&resolved) {
            let key = to_key(&candidate);
            if let Some(program) = self.cache.get(&key) {
                trace!(target: TARGET, path = %key, "Import cache hit");
                return Ok((candidate, Rc::clone(program)));
            }

            if !self.vfs.is_file(&candidate) {
                tried.push(candidate);
                continue;
            }

            let program = Rc::new(self.parse_file(&candidate)?);
            debug!(
                target: TARGET,
                path = %key,
                functions = program.functions.len(),
                types = program.types.len(),
                "Parsed import"
            );
            self.cache.insert(key, Rc::clone(&program));
            return Ok((candidate, program));
        }

        Err(ResolveError::NotFound {
            import_path: import_path.to_string(),
            tried,
        })
    }

    fn candidates(&self, resolved: &Path) -> Vec<PathBuf> {
        let mut paths = vec![resolved.to_path_buf()];
        if resolved.extension().is_none() {
            paths.push(resolved.with_extension(SCRIPT_EXTENSION));
        }
        paths
    }

    fn parse_file(&self, path: &Path) -> Result<Program, ResolveError> {
        let source = self.vfs.read_source(path).map_err(|e| match e {
            VfsError::NotFound { .. } => ResolveError::NotFound {
                import_path: to_key(path),
                tried: vec![path.to_path_buf()],
            },
            other => ResolveError::ReadError {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        parse_program(&source).map_err(|e| ResolveError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("root_dir", &self.root_dir)
            .field("cached", &self.cache.len())
            .field("imported", &self.imported.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebs_vfs::MemoryFileSystem;

    fn create_test_fs() -> MemoryFileSystem {
        MemoryFileSystem::with_files([
            ("/app/main.ebs", "import \"lib/util.ebs\";"),
            ("/app/lib/util.ebs", "helper() { return 1; }"),
            ("/app/my scripts/tool.ebs", "tool() { return 2; }"),
            ("/app/shared.ebs", "var x = 1;"),
            ("/app/broken.ebs", "var = ;"),
        ])
    }

    #[test]
    fn test_resolve_relative_to_importing_file() {
        let resolver = ModuleResolver::new(Box::new(create_test_fs()), "/");
        let path = resolver.resolve_import(Some(Path::new("/app/lib/util.ebs")), "../shared.ebs");
        assert_eq!(path, PathBuf::from("/app/shared.ebs"));
    }

    #[test]
    fn test_resolve_without_current_file_uses_root() {
        let resolver = ModuleResolver::new(Box::new(create_test_fs()), "/app");
        let path = resolver.resolve_import(None, "./lib/./util.ebs");
        assert_eq!(path, PathBuf::from("/app/lib/util.ebs"));
    }

    #[test]
    fn test_load_path_with_spaces() {
        let mut resolver = ModuleResolver::new(Box::new(create_test_fs()), "/");
        let (path, program) = resolver
            .load(Some(Path::new("/app/main.ebs")), "my scripts/tool.ebs")
            .unwrap();
        assert_eq!(path, PathBuf::from("/app/my scripts/tool.ebs"));
        assert_eq!(program.functions.len(), 1);
    }

    #[test]
    fn test_load_adds_extension() {
        let mut resolver = ModuleResolver::new(Box::new(create_test_fs()), "/app");
        let (path, _) = resolver.load(None, "shared").unwrap();
        assert_eq!(path, PathBuf::from("/app/shared.ebs"));
    }

    #[test]
    fn test_load_caches_by_path() {
        let mut resolver = ModuleResolver::new(Box::new(create_test_fs()), "/app");
        resolver.load(None, "shared.ebs").unwrap();
        resolver.load(Some(Path::new("/app/lib/util.ebs")), "../shared.ebs").unwrap();
        assert_eq!(resolver.cache_size(), 1);
    }

    #[test]
    fn test_not_found_maps_to_runtime_error() {
        let mut resolver = ModuleResolver::new(Box::new(create_test_fs()), "/app");
        let err = resolver.load(None, "missing.ebs").unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        let runtime: RuntimeError = err.into();
        assert_eq!(runtime.kind, ErrorKind::NotFoundError);
        assert!(runtime.message.contains("Import file not found"));
    }

    #[test]
    fn test_parse_failure_maps_to_parse_error() {
        let mut resolver = ModuleResolver::new(Box::new(create_test_fs()), "/app");
        let err = resolver.load(None, "broken.ebs").unwrap_err();
        assert!(matches!(err, ResolveError::ParseError { .. }));
        let runtime: RuntimeError = err.into();
        assert_eq!(runtime.kind, ErrorKind::ParseError);
        assert!(runtime.message.contains("Failed to parse import file"));
    }

    #[test]
    fn test_mark_imported_once() {
        let mut resolver = ModuleResolver::new(Box::new(create_test_fs()), "/");
        let path = PathBuf::from("/app/./shared.ebs");
        assert!(resolver.mark_imported(&path));
        assert!(!resolver.mark_imported(Path::new("/app/shared.ebs")));
        resolver.reset_imports();
        assert!(!resolver.is_imported(&path));
    }
}

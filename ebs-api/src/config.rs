//! API configuration
//!
//! `RunConfig` for a single host call, plus a process-wide singleton for
//! hosts (such as the CLI) that configure once at startup.

use ebs_config::LimitConfig;
use ebs_vfs::VirtualFileSystem;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::EbsError;

/// Execution configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Execution limits
    pub limits: LimitConfig,
    /// Path of the entry script; imports resolve relative to its directory
    pub script_path: Option<PathBuf>,
    /// Import base when there is no script path
    pub root_dir: PathBuf,
    /// Collect `print` lines into the output instead of writing to stdout
    pub capture_output: bool,
    /// Source provider for imports; the OS file system when `None`
    pub file_system: Option<Arc<dyn VirtualFileSystem>>,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("limits", &self.limits)
            .field("script_path", &self.script_path)
            .field("root_dir", &self.root_dir)
            .field("capture_output", &self.capture_output)
            .field("file_system", &self.file_system.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limits: LimitConfig::default(),
            script_path: None,
            root_dir: PathBuf::from("."),
            capture_output: false,
            file_system: None,
        }
    }
}

impl RunConfig {
    /// Configuration that captures output, for tests and embedding
    pub fn capturing() -> Self {
        Self {
            capture_output: true,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_script_path(mut self, path: impl AsRef<Path>) -> Self {
        self.script_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_root_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.root_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_file_system(mut self, fs: impl VirtualFileSystem + 'static) -> Self {
        self.file_system = Some(Arc::new(fs));
        self
    }
}

static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();

/// Install the global configuration; fails if one is already installed
pub fn init(config: RunConfig) -> Result<(), EbsError> {
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| EbsError::Config("Config already initialized".to_string()))
}

/// The global configuration, if installed
pub fn config() -> Option<&'static RunConfig> {
    GLOBAL_CONFIG.get()
}

pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}

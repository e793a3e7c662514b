//! EBS Virtual File System
//!
//! The host-side source provider consumed by the module resolver. The core
//! never touches `std::fs` directly; it asks a [`VirtualFileSystem`] for the
//! text of an already-resolved path.
//!
//! # Usage
//! ```rust
//! use ebs_vfs::{MemoryFileSystem, VirtualFileSystem};
//! use std::path::Path;
//!
//! let fs = MemoryFileSystem::with_files([("/lib/util.ebs", "print 1;")]);
//! let text = fs.read_source(Path::new("/lib/util.ebs")).unwrap();
//! assert_eq!(text, "print 1;");
//! ```

mod error;
mod memory;
mod native;
pub mod path;
mod r#trait;

pub use error::{VfsError, VfsResult};
pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;
pub use path::normalize;
pub use r#trait::VirtualFileSystem;

//! Lexical path normalization
//!
//! Import paths are compared and deduplicated by their normalized form, so
//! `./lib/../lib/a.ebs` and `lib/a.ebs` must collapse to the same key without
//! touching the file system.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` segments and unify separators.
///
/// A `..` that would climb above the root of an absolute path is dropped;
/// on a relative path it is kept so the result still points where the
/// input pointed.
pub fn normalize(path: &Path) -> PathBuf {
    let unified = path.to_string_lossy().replace('\\', "/");
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Render a path with forward slashes, for map keys and messages
pub fn to_key(path: &Path) -> String {
    normalize(path).to_string_lossy().replace('\\', "/")
}

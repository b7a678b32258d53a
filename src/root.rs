use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Picks the directory to crawl: the explicit argument, else the nearest
/// ancestor of `cwd` holding one of `markers`, else `cwd` itself.
pub fn resolve(arg: Option<&Path>, markers: &[String], cwd: &Path) -> Result<PathBuf> {
    let root = match arg {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => find_marked_ancestor(cwd, markers).unwrap_or_else(|| cwd.to_path_buf()),
    };
    let root = normalize(&root);

    let meta = std::fs::metadata(&root).map_err(|_| Error::RootNotFound(root.clone()))?;
    if !meta.is_dir() {
        return Err(Error::RootNotDirectory(root));
    }
    Ok(root)
}

pub fn resolve_from_env(arg: Option<&Path>, markers: &[String]) -> Result<PathBuf> {
    let cwd = env::current_dir().map_err(Error::WorkingDir)?;
    resolve(arg, markers, &cwd)
}

// The filesystem root itself is never treated as a project root.
fn find_marked_ancestor(start: &Path, markers: &[String]) -> Option<PathBuf> {
    start
        .ancestors()
        .take_while(|dir| dir.parent().is_some())
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

// Lexical cleanup of `.` and `..` so relative display paths stay short.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

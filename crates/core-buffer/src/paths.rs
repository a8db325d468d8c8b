//! Path normalization for file-backed buffer names.

use std::path::{Path, PathBuf};

/// Canonical absolute form of `path`, used as the identity of file-backed
/// buffers. Falls back to canonicalizing the parent (the file itself may not
/// exist yet), then to plain absolutization.
pub(crate) fn real_path(path: &str) -> String {
    let p = Path::new(path);
    if let Ok(canonical) = p.canonicalize() {
        return path_to_string(&canonical);
    }
    if let (Some(parent), Some(file)) = (p.parent(), p.file_name())
        && !parent.as_os_str().is_empty()
        && let Ok(parent) = parent.canonicalize()
    {
        return path_to_string(&parent.join(file));
    }
    match std::path::absolute(p) {
        Ok(abs) => path_to_string(&abs),
        Err(_) => path.to_string(),
    }
}

/// Shortened rendition for display: relative to the working directory when
/// inside it, `~`-prefixed when under the home directory, unchanged
/// otherwise.
pub(crate) fn compact_path(path: &str) -> String {
    let p = Path::new(path);
    if let Ok(cwd) = std::env::current_dir()
        && let Ok(rel) = p.strip_prefix(&cwd)
        && !rel.as_os_str().is_empty()
    {
        return path_to_string(rel);
    }
    if let Some(home) = dirs::home_dir()
        && let Ok(rel) = p.strip_prefix(&home)
        && !rel.as_os_str().is_empty()
    {
        return format!("~/{}", path_to_string(rel));
    }
    path.to_string()
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

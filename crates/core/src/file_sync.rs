//! Writes or removes a single deployed page.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

/// File name every page is stored under.
pub const INDEX_FILE: &str = "index.html";

/// What [`sync_file`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Written,
    Deleted,
    /// Content was empty and there was nothing to delete.
    Absent,
    /// The write or delete failed; the reason is logged and kept here.
    Failed(String),
}

impl FileAction {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// `<uri>/index.html`, keeping only plain path segments so the result never
/// leaves the directory it is joined onto.
pub fn artifact_relative_path(uri: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in uri.split(['/', '\\']) {
        let mut components = Path::new(segment).components();
        if let (Some(Component::Normal(part)), None) = (components.next(), components.next()) {
            path.push(part);
        }
    }
    path.push(INDEX_FILE);
    path
}

/// On-disk location of `uri` inside `repository`.
pub fn artifact_path(repository: &Path, uri: &str) -> PathBuf {
    repository.join(artifact_relative_path(uri))
}

/// Make `path` hold exactly `content`, or remove it when `content` is empty.
///
/// Never fails: I/O problems are logged and returned as
/// [`FileAction::Failed`].
pub fn sync_file(content: &str, path: &Path) -> FileAction {
    if content.is_empty() {
        return match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed page");
                FileAction::Deleted
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileAction::Absent,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove page");
                FileAction::Failed(e.to_string())
            }
        };
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %path.display(), error = %e, "failed to create page directory");
            return FileAction::Failed(e.to_string());
        }
    }
    match std::fs::write(path, content) {
        Ok(()) => {
            debug!(path = %path.display(), bytes = content.len(), "wrote page");
            FileAction::Written
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to write page");
            FileAction::Failed(e.to_string())
        }
    }
}

//! Filesystem access used when relocating recordings.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors relocating a single recording.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The recording does not exist (after path translation).
    #[error("recording file not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// The destination folder could not be created.
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file could not be moved.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The filesystem operations needed to relocate recordings.
///
/// Operations may block; the session controller calls them from tokio's
/// blocking pool.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    /// Creates `path` and all missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match std::fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(from = %from.display(), "rename crosses filesystems, copying");
                std::fs::copy(from, to)?;
                std::fs::remove_file(from)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_file_renames_within_a_filesystem() {
        let temp = tempfile::tempdir().unwrap();
        let from = temp.path().join("clip.mkv");
        let to = temp.path().join("sorted").join("clip.mkv");
        std::fs::write(&from, b"frames").unwrap();

        LocalFs.create_dir_all(to.parent().unwrap()).unwrap();
        LocalFs.move_file(&from, &to).unwrap();

        assert!(!LocalFs.exists(&from));
        assert_eq!(std::fs::read(&to).unwrap(), b"frames");
    }

    #[test]
    fn create_dir_all_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("a").join("b");
        LocalFs.create_dir_all(&dir).unwrap();
        LocalFs.create_dir_all(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn moving_a_missing_file_fails() {
        let temp = tempfile::tempdir().unwrap();
        let err = LocalFs
            .move_file(&temp.path().join("missing"), &temp.path().join("dest"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}

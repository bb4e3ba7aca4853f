use std::{
    fs,
    io::{ErrorKind, Write},
    path::Path,
};

use deskshell_core::storage::{FileSystem, StoreError};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Local disk implementation of `FileSystem`.
///
/// Writes go to a temp file in the target directory which is synced and then
/// renamed over the destination, so a crash leaves either the old file or the
/// new one. On Unix the directory is synced after the rename so the new entry
/// itself is durable, and the temp file (and therefore the result) is mode 0600.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        fs::read(path).map_err(|e| StoreError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let write_err = |reason: String| StoreError::WriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        let parent = path
            .parent()
            .ok_or_else(|| write_err("invalid storage path".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| write_err(e.to_string()))?;
        tmp.write_all(bytes).map_err(|e| write_err(e.to_string()))?;
        tmp.flush().map_err(|e| write_err(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| write_err(e.to_string()))?;
        tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;
        sync_dir(parent).map_err(|e| write_err(format!("directory sync failed: {e}")))
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn delete(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::WriteFailed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }),
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

// Directory handles cannot be fsynced on Windows.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

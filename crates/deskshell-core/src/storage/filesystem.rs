use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use super::StoreError;

/// Filesystem primitives used by the settings store.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Replace the file at `path`. Readers must never observe a partial write.
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove `path`; a missing file is not an error.
    fn delete(&self, path: &Path) -> Result<(), StoreError>;
}

/// In-memory filesystem for tests. Clones share state.
///
/// Every successful write or removal bumps a mutation counter so tests can
/// assert that an operation touched nothing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    mutations: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without counting it as a mutation.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), bytes.into());
        }
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail with `WriteFailed`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self, path: &Path) -> Result<MutexGuard<'_, HashMap<PathBuf, Vec<u8>>>, StoreError> {
        self.files.lock().map_err(|err| StoreError::ReadFailed {
            path: path.to_path_buf(),
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl FileSystem for InMemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock(path)
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        self.lock(path)?
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::ReadFailed {
                path: path.to_path_buf(),
                reason: "not found".to_string(),
            })
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                path: path.to_path_buf(),
                reason: "simulated write failure".to_string(),
            });
        }
        self.lock(path)?.insert(path.to_path_buf(), bytes.to_vec());
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), StoreError> {
        if self.lock(path)?.remove(path).is_some() {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_delete() {
        let fs = InMemoryFileSystem::new();
        let path = Path::new("/cfg/settings.json");

        fs.write_bytes(path, b"{}").expect("write");
        assert!(fs.exists(path));
        assert_eq!(fs.read_bytes(path).expect("read"), b"{}");

        fs.delete(path).expect("delete");
        fs.delete(path).expect("delete again");
        assert!(!fs.exists(path));
        assert_eq!(fs.mutation_count(), 2);
    }

    #[test]
    fn seeded_files_are_not_mutations() {
        let fs = InMemoryFileSystem::new();
        fs.insert("/cfg/a", b"x".to_vec());
        assert!(fs.exists(Path::new("/cfg/a")));
        assert_eq!(fs.mutation_count(), 0);
    }

    #[test]
    fn simulated_write_failure() {
        let fs = InMemoryFileSystem::new();
        fs.fail_writes(true);
        let err = fs
            .write_bytes(Path::new("/cfg/a"), b"x")
            .expect_err("write should fail");
        assert!(matches!(err, StoreError::WriteFailed { .. }));
        assert!(!fs.exists(Path::new("/cfg/a")));
    }
}

use std::path::{Path, PathBuf};

/// Base name used when the host does not pick one.
pub const DEFAULT_BASE_NAME: &str = "settings";

const CURRENT_EXT: &str = "enc";
const LEGACY_EXT: &str = "json";

/// The pair of files that together hold one logical settings record.
///
/// `current` holds the encrypted blob and is authoritative whenever it exists.
/// `legacy` holds plaintext JSON: the pre-encryption format, and the fallback
/// target when no keystore is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub current: PathBuf,
    pub legacy: PathBuf,
}

impl StorageLocation {
    pub fn new(dir: impl AsRef<Path>, base_name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            current: dir.join(format!("{base_name}.{CURRENT_EXT}")),
            legacy: dir.join(format!("{base_name}.{LEGACY_EXT}")),
        }
    }

    /// `settings.enc` / `settings.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, DEFAULT_BASE_NAME)
    }
}

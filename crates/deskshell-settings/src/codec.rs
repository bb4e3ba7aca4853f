use deskshell_core::{
    location::StorageLocation,
    settings::Settings,
    storage::{EncryptionProvider, FileSystem, StoreError},
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Tunables for the save/load algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Remove a plaintext legacy file once the encrypted file is known good
    /// (after decrypting it, or after an encrypted save). Off by default: a
    /// legacy file next to a current one is otherwise left alone.
    pub purge_stale_legacy: bool,
}

/// Where a successful save landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    Encrypted,
    /// Keystore unavailable; written as plaintext to the legacy path.
    Plaintext,
}

/// Where a loaded value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing on disk.
    Defaults,
    /// Decrypted from the current file.
    Current,
    /// Read from the legacy plaintext file and left in place.
    Legacy,
    /// Read from the legacy file, re-written encrypted, legacy removed.
    Migrated,
    /// Loading failed; defaults were substituted.
    Fallback(StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub settings: Settings,
    pub source: LoadSource,
}

/// Serialize settings to the on-disk JSON encoding (unknown keys included).
pub fn encode(settings: &Settings) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(settings).map_err(|e| StoreError::EncodeFailed {
        reason: e.to_string(),
    })
}

/// Parse stored JSON and merge it onto the defaults.
pub fn decode(bytes: &[u8]) -> Result<Settings, StoreError> {
    if bytes.is_empty() {
        return Err(StoreError::DecodeFailed {
            reason: "empty file".to_string(),
        });
    }
    let value: Value = serde_json::from_slice(bytes).map_err(decode_err)?;
    Settings::merge_onto_defaults(value).map_err(decode_err)
}

/// Save/load algorithm over an encrypted current file and a plaintext legacy
/// file. Every call re-probes encryption availability.
pub struct SettingsCodec<E: EncryptionProvider, F: FileSystem> {
    location: StorageLocation,
    encryption: E,
    fs: F,
    options: StoreOptions,
}

impl<E: EncryptionProvider, F: FileSystem> SettingsCodec<E, F> {
    pub fn new(location: StorageLocation, encryption: E, fs: F, options: StoreOptions) -> Self {
        Self {
            location,
            encryption,
            fs,
            options,
        }
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    pub fn encryption(&self) -> &E {
        &self.encryption
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    #[instrument(skip_all)]
    pub fn save(&self, settings: &Settings) -> Result<SaveTarget, StoreError> {
        let bytes = encode(settings)?;

        if self.encryption.is_available() {
            self.write_encrypted(&bytes)?;
            if self.options.purge_stale_legacy {
                self.purge_legacy();
            }
            return Ok(SaveTarget::Encrypted);
        }

        warn!(
            path = %self.location.legacy.display(),
            "encryption unavailable; settings stored unencrypted"
        );
        self.fs.write_bytes(&self.location.legacy, &bytes)?;
        // An older encrypted copy would shadow the value just written.
        self.fs.delete(&self.location.current)?;
        Ok(SaveTarget::Plaintext)
    }

    /// Load settings. The current file, when present, is authoritative: a
    /// failure to open it is reported rather than falling back to the legacy
    /// file. A legacy file is migrated only while encryption is available.
    #[instrument(skip_all)]
    pub fn load(&self) -> Result<Loaded, StoreError> {
        if self.fs.exists(&self.location.current) {
            let settings = self.load_current()?;
            self.check_stale_legacy();
            return Ok(Loaded {
                settings,
                source: LoadSource::Current,
            });
        }

        if self.fs.exists(&self.location.legacy) {
            let bytes = self.fs.read_bytes(&self.location.legacy)?;
            let settings = decode(&bytes)?;

            if !self.encryption.is_available() {
                debug!("encryption unavailable; using legacy settings without migrating");
                return Ok(Loaded {
                    settings,
                    source: LoadSource::Legacy,
                });
            }

            let source = match self.migrate(&settings) {
                Ok(()) => LoadSource::Migrated,
                Err(err) => {
                    warn!(error = %err, "settings migration failed; legacy file kept");
                    LoadSource::Legacy
                }
            };
            return Ok(Loaded { settings, source });
        }

        debug!("no stored settings; using defaults");
        Ok(Loaded {
            settings: Settings::default(),
            source: LoadSource::Defaults,
        })
    }

    /// Remove both files. Both removals are attempted; the first error wins.
    #[instrument(skip_all)]
    pub fn delete(&self) -> Result<(), StoreError> {
        let current = self.fs.delete(&self.location.current);
        let legacy = self.fs.delete(&self.location.legacy);
        current.and(legacy)
    }

    fn load_current(&self) -> Result<Settings, StoreError> {
        let blob = self.fs.read_bytes(&self.location.current)?;
        if !self.encryption.is_available() {
            return Err(StoreError::DecryptFailed {
                reason: "encrypted settings present but keystore unavailable".to_string(),
            });
        }
        let plaintext = self.encryption.decrypt(&blob)?;
        decode(&plaintext)
    }

    fn write_encrypted(&self, plaintext: &[u8]) -> Result<(), StoreError> {
        let blob = self.encryption.encrypt(plaintext)?;
        self.fs.write_bytes(&self.location.current, &blob)?;
        debug!(path = %self.location.current.display(), "settings saved encrypted");
        Ok(())
    }

    /// The legacy file is removed only after the encrypted copy is written.
    fn migrate(&self, settings: &Settings) -> Result<(), StoreError> {
        let bytes = encode(settings)?;
        self.write_encrypted(&bytes)?;
        self.fs.delete(&self.location.legacy)?;
        debug!("legacy settings migrated to encrypted storage");
        Ok(())
    }

    fn check_stale_legacy(&self) {
        if !self.fs.exists(&self.location.legacy) {
            return;
        }
        if self.options.purge_stale_legacy {
            self.purge_legacy();
        } else {
            warn!(
                path = %self.location.legacy.display(),
                "stale plaintext settings found next to encrypted settings; ignoring"
            );
        }
    }

    fn purge_legacy(&self) {
        if !self.fs.exists(&self.location.legacy) {
            return;
        }
        match self.fs.delete(&self.location.legacy) {
            Ok(()) => debug!("removed stale plaintext settings"),
            Err(err) => warn!(error = %err, "failed to remove stale plaintext settings"),
        }
    }
}

fn decode_err<E: ToString>(err: E) -> StoreError {
    StoreError::DecodeFailed {
        reason: err.to_string(),
    }
}

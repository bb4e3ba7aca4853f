use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::StoreError;

/// Platform secret-encryption capability (OS keychain, DPAPI, secret service).
///
/// `is_available` is a side-effect free probe and is asked again before every
/// encrypt or decrypt; keystores come and go between runs.
pub trait EncryptionProvider: Send + Sync {
    fn is_available(&self) -> bool;

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Fails with `StoreError::DecryptFailed` on tampered or foreign input.
    fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, StoreError>;
}

/// In-memory encryption double for tests and smoke runs.
/// This is not cryptographically secure; bytes are XOR-masked behind a tag so
/// plaintext never appears in the blob and arbitrary input fails to decrypt.
/// Clones share the availability switch.
#[derive(Debug, Clone)]
pub struct InMemoryEncryption {
    available: Arc<AtomicBool>,
}

impl Default for InMemoryEncryption {
    fn default() -> Self {
        Self {
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryEncryption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        let provider = Self::default();
        provider.set_available(false);
        provider
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl EncryptionProvider for InMemoryEncryption {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        if !self.is_available() {
            return Err(StoreError::EncodeFailed {
                reason: "encryption unavailable".to_string(),
            });
        }
        let mut blob = TAG.to_vec();
        blob.extend(mask(plaintext));
        Ok(blob)
    }

    fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, StoreError> {
        if !self.is_available() {
            return Err(StoreError::DecryptFailed {
                reason: "encryption unavailable".to_string(),
            });
        }
        let masked = blob
            .strip_prefix(TAG)
            .ok_or_else(|| StoreError::DecryptFailed {
                reason: "unrecognised blob".to_string(),
            })?;
        Ok(mask(masked))
    }
}

const TAG: &[u8] = b"MEMENC1:";
const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use deskshell_core::storage::{EncryptionProvider, StoreError};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::key_provider::{KeyMaterial, KeyProvider};

const BLOB_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;

/// AES-256-GCM implementation of the platform encryption capability.
/// The data key lives in a `KeyProvider` (OS keyring in production) and is
/// created on first encrypt; decrypt never creates one.
pub struct AesGcmEncryption<P: KeyProvider> {
    key_provider: P,
}

impl<P: KeyProvider> AesGcmEncryption<P> {
    pub fn new(key_provider: P) -> Self {
        Self { key_provider }
    }

    pub fn key_provider(&self) -> &P {
        &self.key_provider
    }
}

/// On-disk envelope.
#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    v: u8,
    nonce: String,
    ciphertext: String,
}

impl<P: KeyProvider> EncryptionProvider for AesGcmEncryption<P> {
    fn is_available(&self) -> bool {
        self.key_provider.is_available()
    }

    #[instrument(skip_all)]
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let key_material = self
            .key_provider
            .get_or_create()
            .map_err(|e| encode_err(format!("key provider: {e}")))?;

        let cipher = build_cipher(&key_material).map_err(encode_err)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| encode_err(format!("encrypt failed: {e}")))?;

        let blob = StoredBlob {
            v: BLOB_VERSION,
            nonce: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };
        serde_json::to_vec(&blob).map_err(|e| encode_err(e.to_string()))
    }

    #[instrument(skip_all)]
    fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, StoreError> {
        let blob: StoredBlob = serde_json::from_slice(blob)
            .map_err(|e| decrypt_err(format!("envelope: {e}")))?;
        if blob.v != BLOB_VERSION {
            return Err(decrypt_err(format!("unsupported blob version {}", blob.v)));
        }

        let key_material = self
            .key_provider
            .get()
            .map_err(|e| decrypt_err(format!("key provider: {e}")))?;
        let cipher = build_cipher(&key_material).map_err(decrypt_err)?;

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(blob.nonce)
            .map_err(|e| decrypt_err(format!("nonce decode failed: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(decrypt_err(format!(
                "expected {NONCE_LEN}-byte nonce, got {}",
                nonce_bytes.len()
            )));
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = URL_SAFE_NO_PAD
            .decode(blob.ciphertext)
            .map_err(|e| decrypt_err(format!("ciphertext decode failed: {e}")))?;

        cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| decrypt_err(format!("decrypt failed: {e}")))
    }
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, String> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| format!("cipher init failed: {e}"))
}

fn encode_err(reason: String) -> StoreError {
    StoreError::EncodeFailed { reason }
}

fn decrypt_err(reason: String) -> StoreError {
    StoreError::DecryptFailed { reason }
}

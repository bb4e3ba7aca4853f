use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::debug;

/// Key material used for encryption at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Identifier for logging/rotation (never log key bytes).
    pub id: String,
    /// 256-bit symmetric key.
    pub bytes: [u8; 32],
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("no key stored")]
    Missing,
    #[error("decode error: {0}")]
    Decode(String),
    #[error("key store unavailable")]
    Unavailable,
}

/// Provides access to the settings data key (OS keychain in production;
/// memory in tests).
pub trait KeyProvider: Send + Sync {
    /// Whether the backing keystore can be reached. Must not create or
    /// modify anything.
    fn is_available(&self) -> bool;

    /// The stored key; `KeyError::Missing` if none has been created yet.
    fn get(&self) -> Result<KeyMaterial, KeyError>;

    /// The stored key, generating and persisting one on first use.
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// OS keyring-backed provider. Uses the `keyring` crate to store the key.
pub struct KeyringProvider {
    service: String,
    account: String,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, KeyError> {
        keyring::Entry::new(&self.service, &self.account).map_err(|e| KeyError::Keyring(e.to_string()))
    }
}

impl KeyProvider for KeyringProvider {
    fn is_available(&self) -> bool {
        let Ok(entry) = self.entry() else {
            return false;
        };
        // A reachable keystore that simply has no entry yet is still usable.
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(err) => {
                debug!(error = %err, "keyring probe failed");
                false
            }
        }
    }

    fn get(&self) -> Result<KeyMaterial, KeyError> {
        match self.entry()?.get_password() {
            Ok(secret) => decode_key(&secret),
            Err(keyring::Error::NoEntry) => Err(KeyError::Missing),
            Err(err) => Err(KeyError::Keyring(err.to_string())),
        }
    }

    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        match self.get() {
            Err(KeyError::Missing) => {}
            other => return other,
        }

        let material = generate_key();
        self.entry()?
            .set_password(&encode_key(&material))
            .map_err(|e| KeyError::Keyring(e.to_string()))?;
        debug!(key_id = %material.id, "created settings data key");
        Ok(material)
    }
}

/// In-memory key provider for tests and ephemeral sessions.
/// Clones share the key and the availability switch.
#[derive(Debug, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryKeyProvider {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryKeyProvider {
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn get(&self) -> Result<KeyMaterial, KeyError> {
        if !self.is_available() {
            return Err(KeyError::Unavailable);
        }
        let guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Keyring(format!("lock poisoned: {err}")))?;
        guard.clone().ok_or(KeyError::Missing)
    }

    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        if !self.is_available() {
            return Err(KeyError::Unavailable);
        }
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Keyring(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let material = generate_key();
        *guard = Some(material.clone());
        Ok(material)
    }
}

fn generate_key() -> KeyMaterial {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial {
        id: "default".to_string(),
        bytes,
    }
}

fn encode_key(material: &KeyMaterial) -> String {
    general_purpose::STANDARD.encode(material.bytes)
}

fn decode_key(secret: &str) -> Result<KeyMaterial, KeyError> {
    let bytes = general_purpose::STANDARD
        .decode(secret)
        .map_err(|e| KeyError::Decode(e.to_string()))?;

    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| KeyError::Decode(format!("expected 32 bytes, got {}", b.len())))?;
    Ok(KeyMaterial {
        id: "default".to_string(),
        bytes,
    })
}

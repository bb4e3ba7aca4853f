//! Storage contracts for the settings store: the error taxonomy and the two
//! capabilities injected by the host (platform encryption, filesystem).

mod encryption;
mod filesystem;

use std::path::PathBuf;

use thiserror::Error;

pub use encryption::{EncryptionProvider, InMemoryEncryption};
pub use filesystem::{FileSystem, InMemoryFileSystem};

/// Errors produced by settings persistence. None of these escape the store
/// facade; they surface as diagnostics and default values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A file exists but could not be read.
    #[error("failed to read {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },
    /// A file could not be written, replaced or removed.
    #[error("failed to write {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
    /// Ciphertext was corrupt, produced under another key, or the keystore
    /// needed to open it is not reachable.
    #[error("decryption failed: {reason}")]
    DecryptFailed { reason: String },
    /// A value could not be serialized or encrypted.
    #[error("encoding failed: {reason}")]
    EncodeFailed { reason: String },
    /// Stored bytes were not a valid settings object (including empty files).
    #[error("decoding failed: {reason}")]
    DecodeFailed { reason: String },
}

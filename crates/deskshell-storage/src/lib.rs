//! Production capabilities for the settings store.
//! AES-256-GCM encryption with the data key kept in the OS keyring, and a
//! local filesystem with atomic replace-on-write.

pub mod aes_gcm_encryption;
pub mod key_provider;
pub mod local_fs;

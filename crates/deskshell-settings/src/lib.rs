//! Persistent settings for Deskshell: encoding, legacy migration, and the
//! `SettingsStore` facade the rest of the application talks to.

pub mod codec;
pub mod store;

pub use codec::{LoadSource, Loaded, SaveTarget, SettingsCodec, StoreOptions};
pub use store::{LoadReport, SettingsStore};

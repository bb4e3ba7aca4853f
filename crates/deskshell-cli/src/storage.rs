use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use deskshell_core::location::StorageLocation;
use deskshell_settings::{SettingsStore, StoreOptions};
use deskshell_storage::{
    aes_gcm_encryption::AesGcmEncryption, key_provider::KeyringProvider, local_fs::LocalFileSystem,
};
use dirs::data_dir;
use tracing::debug;

pub type ProductionStore = SettingsStore<AesGcmEncryption<KeyringProvider>, LocalFileSystem>;

/// Resolve the default data directory for Deskshell.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("deskshell"))
}

/// Build the settings store using the OS keychain, honouring config overrides.
pub fn store_from_config(config: &Config) -> Result<ProductionStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing settings store");

    let keys = KeyringProvider::new(config.keyring_service(), config.keyring_account());
    Ok(SettingsStore::with_options(
        StorageLocation::in_dir(root),
        AesGcmEncryption::new(keys),
        LocalFileSystem,
        StoreOptions {
            purge_stale_legacy: config.purge_stale_legacy,
        },
    ))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use deskshell_core::settings::Settings;
    use deskshell_settings::LoadSource;
    use deskshell_storage::key_provider::InMemoryKeyProvider;

    use super::*;

    type TestStore = SettingsStore<AesGcmEncryption<InMemoryKeyProvider>, LocalFileSystem>;

    /// Store rooted at a temp dir with an in-memory key.
    fn test_store(root: &Path, keys: InMemoryKeyProvider) -> TestStore {
        SettingsStore::new(
            StorageLocation::in_dir(root),
            AesGcmEncryption::new(keys),
            LocalFileSystem,
        )
    }

    #[test]
    fn encrypted_round_trip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = test_store(dir.path(), InMemoryKeyProvider::default());
        let settings = Settings {
            start_at_login: true,
            ..Settings::default()
        };

        assert!(store.save(&settings));
        let on_disk = fs::read_to_string(&store.location().current).expect("read ciphertext");
        assert!(!on_disk.contains("startAtLogin"), "plaintext must not be stored");
        assert!(!store.location().legacy.exists());

        assert_eq!(store.load(), settings);
    }

    #[test]
    fn migrates_plaintext_file_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = test_store(dir.path(), InMemoryKeyProvider::default());
        fs::write(
            &store.location().legacy,
            r#"{"minimizeToTray":false,"customKey":[1,2]}"#,
        )
        .expect("seed legacy");

        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Migrated);
        assert!(!report.settings.minimize_to_tray);
        assert!(!store.location().legacy.exists());
        assert!(store.location().current.exists());

        assert_eq!(store.load_report().source, LoadSource::Current);
        assert_eq!(store.load(), report.settings);
    }

    #[test]
    fn keystore_outage_uses_plaintext_then_recovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keys = InMemoryKeyProvider::default();
        keys.set_available(false);
        let store = test_store(dir.path(), keys.clone());

        let settings = Settings {
            start_minimized: true,
            ..Settings::default()
        };
        assert!(store.save(&settings));
        assert!(store.location().legacy.exists());
        assert_eq!(store.load_report().source, LoadSource::Legacy);

        keys.set_available(true);
        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Migrated);
        assert_eq!(report.settings, settings);
        assert!(!store.location().legacy.exists());
    }

    #[test]
    fn outage_save_replaces_older_encrypted_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keys = InMemoryKeyProvider::default();
        let store = test_store(dir.path(), keys.clone());
        assert!(store.save(&Settings::default()));

        keys.set_available(false);
        let newer = Settings {
            minimize_to_tray: false,
            ..Settings::default()
        };
        assert!(store.save(&newer));
        assert!(!store.location().current.exists());
        assert_eq!(store.load(), newer);

        keys.set_available(true);
        assert_eq!(store.load(), newer);
        assert!(store.location().current.exists());
        assert!(!store.location().legacy.exists());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = test_store(dir.path(), InMemoryKeyProvider::default());
        fs::write(&store.location().current, [0xde_u8, 0xad, 0xbe, 0xef]).expect("seed");

        assert_eq!(store.load(), Settings::default());
        assert!(store.location().current.exists());
    }

    #[test]
    fn reset_removes_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = test_store(dir.path(), InMemoryKeyProvider::default());
        assert!(store.save(&Settings::default()));
        fs::write(&store.location().legacy, "{}").expect("seed legacy");

        assert!(store.delete());
        assert!(!store.location().current.exists());
        assert!(!store.location().legacy.exists());
        assert!(store.delete());
    }
}

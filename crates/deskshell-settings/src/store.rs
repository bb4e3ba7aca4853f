use deskshell_core::{
    location::StorageLocation,
    settings::Settings,
    storage::{EncryptionProvider, FileSystem, StoreError},
};
use tracing::{error, info, warn};

use crate::codec::{LoadSource, Loaded, SaveTarget, SettingsCodec, StoreOptions};

/// Result of a `load_report` call: the settings in effect plus their origin.
pub type LoadReport = Loaded;

/// Settings persistence consumed by the rest of the application.
///
/// Constructed once at startup and handed by reference to whatever needs it.
/// `load` never fails (defaults are substituted); `save` and `delete` report
/// success as a boolean. Errors are logged, never raised.
pub struct SettingsStore<E: EncryptionProvider, F: FileSystem> {
    codec: SettingsCodec<E, F>,
}

impl<E: EncryptionProvider, F: FileSystem> SettingsStore<E, F> {
    pub fn new(location: StorageLocation, encryption: E, fs: F) -> Self {
        Self::with_options(location, encryption, fs, StoreOptions::default())
    }

    pub fn with_options(
        location: StorageLocation,
        encryption: E,
        fs: F,
        options: StoreOptions,
    ) -> Self {
        Self {
            codec: SettingsCodec::new(location, encryption, fs, options),
        }
    }

    pub fn location(&self) -> &StorageLocation {
        self.codec.location()
    }

    /// Which of the (current, legacy) files exist right now.
    pub fn files_present(&self) -> (bool, bool) {
        let location = self.codec.location();
        let fs = self.codec.fs();
        (fs.exists(&location.current), fs.exists(&location.legacy))
    }

    /// Fresh probe of the encryption capability.
    pub fn encryption_available(&self) -> bool {
        self.codec.encryption().is_available()
    }

    pub fn load(&self) -> Settings {
        self.load_report().settings
    }

    pub fn load_report(&self) -> LoadReport {
        match self.codec.load() {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(error = %err, "failed to load settings; using defaults");
                Loaded {
                    settings: Settings::default(),
                    source: LoadSource::Fallback(err),
                }
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> bool {
        match self.codec.save(settings) {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "failed to save settings");
                false
            }
        }
    }

    /// Remove every persisted copy. Deleting when nothing exists succeeds.
    pub fn delete(&self) -> bool {
        match self.codec.delete() {
            Ok(()) => {
                info!("settings deleted");
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to delete settings");
                false
            }
        }
    }

    /// Like `save`, but hands back the error for hosts that report it.
    pub fn try_save(&self, settings: &Settings) -> Result<SaveTarget, StoreError> {
        self.codec.save(settings)
    }
}

#[cfg(test)]
mod tests {
    use deskshell_core::storage::{InMemoryEncryption, InMemoryFileSystem};
    use serde_json::json;

    use super::*;
    use crate::codec::{decode, encode};

    type TestStore = SettingsStore<InMemoryEncryption, InMemoryFileSystem>;

    fn test_store() -> (TestStore, InMemoryEncryption, InMemoryFileSystem) {
        let enc = InMemoryEncryption::new();
        let fs = InMemoryFileSystem::new();
        let store = SettingsStore::new(StorageLocation::in_dir("/data"), enc.clone(), fs.clone());
        (store, enc, fs)
    }

    fn custom() -> Settings {
        let mut settings = Settings {
            start_minimized: true,
            minimize_to_tray: false,
            start_at_login: true,
            ..Settings::default()
        };
        settings.extra.insert("windowBounds".into(), json!({ "w": 1280, "h": 800 }));
        settings
    }

    #[test]
    fn round_trip_with_encryption() {
        let (store, _, fs) = test_store();
        assert!(store.save(&custom()));

        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Current);
        assert_eq!(report.settings, custom());
        assert!(fs.contents(&store.location().legacy).is_none());
    }

    #[test]
    fn round_trip_without_encryption() {
        let (store, enc, fs) = test_store();
        enc.set_available(false);
        assert!(store.save(&custom()));

        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Legacy);
        assert_eq!(report.settings, custom());
        assert!(fs.contents(&store.location().current).is_none());
    }

    #[test]
    fn outage_save_is_visible_and_survives_recovery() {
        let (store, enc, fs) = test_store();
        assert!(store.save(&Settings::default()));

        enc.set_available(false);
        assert!(store.save(&custom()));
        assert_eq!(store.files_present(), (false, true));
        assert_eq!(store.load(), custom());

        enc.set_available(true);
        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Migrated);
        assert_eq!(report.settings, custom());
        assert!(fs.contents(&store.location().legacy).is_none());
        assert_eq!(store.load(), custom());
    }

    #[test]
    fn migrates_legacy_exactly_once() {
        let (store, enc, fs) = test_store();
        let location = store.location().clone();
        fs.insert(&location.legacy, br#"{"startMinimized":true,"lang":"de"}"#.to_vec());

        let first = store.load_report();
        assert_eq!(first.source, LoadSource::Migrated);
        assert!(first.settings.start_minimized);
        assert!(first.settings.minimize_to_tray);
        assert_eq!(first.settings.extra.get("lang"), Some(&json!("de")));

        assert!(fs.contents(&location.legacy).is_none());
        let blob = fs.contents(&location.current).expect("encrypted copy");
        let migrated = decode(&enc.decrypt(&blob).expect("decrypt")).expect("decode");
        assert_eq!(migrated, first.settings);

        let mutations = fs.mutation_count();
        let second = store.load_report();
        assert_eq!(second.source, LoadSource::Current);
        assert_eq!(second.settings, first.settings);
        assert_eq!(fs.mutation_count(), mutations);
    }

    #[test]
    fn no_migration_without_encryption() {
        let (store, enc, fs) = test_store();
        enc.set_available(false);
        let location = store.location().clone();
        let legacy = br#"{"startAtLogin":true}"#.to_vec();
        fs.insert(&location.legacy, legacy.clone());

        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Legacy);
        assert!(report.settings.start_at_login);
        assert_eq!(fs.contents(&location.legacy), Some(legacy));
        assert!(fs.contents(&location.current).is_none());
        assert_eq!(fs.mutation_count(), 0);
    }

    #[test]
    fn corrupt_encrypted_file_falls_back_to_defaults() {
        let (store, _, fs) = test_store();
        fs.insert(&store.location().current, vec![0x9f, 0x00, 0x42, 0xee, 0x17, 0x01]);

        let report = store.load_report();
        assert_eq!(report.settings, Settings::default());
        assert!(matches!(
            report.source,
            LoadSource::Fallback(StoreError::DecryptFailed { .. })
        ));
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn empty_files_fall_back_to_defaults() {
        let (store, _, fs) = test_store();
        fs.insert(&store.location().legacy, Vec::new());
        assert!(matches!(
            store.load_report().source,
            LoadSource::Fallback(StoreError::DecodeFailed { .. })
        ));

        fs.insert(&store.location().current, Vec::new());
        assert!(matches!(
            store.load_report().source,
            LoadSource::Fallback(StoreError::DecryptFailed { .. })
        ));
    }

    #[test]
    fn first_run_returns_defaults_without_side_effects() {
        let (store, _, fs) = test_store();
        let report = store.load_report();
        assert_eq!(report.source, LoadSource::Defaults);
        assert_eq!(report.settings, Settings::default());
        assert_eq!(fs.mutation_count(), 0);
    }

    #[test]
    fn partial_schema_is_merged_onto_defaults() {
        let (store, enc, fs) = test_store();
        let blob = enc
            .encrypt(br#"{"startMinimized":true}"#)
            .expect("encrypt");
        fs.insert(&store.location().current, blob);

        let defaults = Settings::default();
        assert_eq!(
            store.load(),
            Settings {
                start_minimized: true,
                minimize_to_tray: defaults.minimize_to_tray,
                start_at_login: defaults.start_at_login,
                extra: Default::default(),
            }
        );
    }

    #[test]
    fn current_wins_and_stale_legacy_is_left_alone() {
        let (store, _, fs) = test_store();
        let location = store.location().clone();
        assert!(store.save(&custom()));
        let stale = encode(&Settings::default()).expect("encode");
        fs.insert(&location.legacy, stale.clone());

        assert_eq!(store.load(), custom());
        assert_eq!(fs.contents(&location.legacy), Some(stale));
    }

    #[test]
    fn each_save_is_one_write() {
        let (store, _, fs) = test_store();
        let mut settings = store.load();
        for _ in 0..3 {
            settings.start_minimized = !settings.start_minimized;
            assert!(store.save(&settings));
        }
        assert_eq!(fs.mutation_count(), 3);
        assert!(store.load().start_minimized);
    }

    #[test]
    fn save_failure_returns_false() {
        let (store, _, fs) = test_store();
        fs.fail_writes(true);
        assert!(!store.save(&custom()));
        assert!(matches!(
            store.try_save(&custom()),
            Err(StoreError::WriteFailed { .. })
        ));
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn delete_is_idempotent() {
        let (store, _, fs) = test_store();
        assert!(store.delete());
        assert_eq!(fs.mutation_count(), 0);

        assert!(store.save(&custom()));
        assert!(store.delete());
        assert!(store.delete());
        assert_eq!(store.load_report().source, LoadSource::Defaults);
    }

    #[test]
    fn files_present_tracks_both_paths() {
        let (store, enc, _) = test_store();
        assert_eq!(store.files_present(), (false, false));
        enc.set_available(false);
        assert!(store.save(&custom()));
        assert_eq!(store.files_present(), (false, true));
        enc.set_available(true);
        store.load();
        assert_eq!(store.files_present(), (true, false));
    }

    #[test]
    fn encryption_probe_is_not_cached() {
        let (store, enc, _) = test_store();
        assert!(store.encryption_available());
        enc.set_available(false);
        assert!(!store.encryption_available());
        enc.set_available(true);
        assert!(store.encryption_available());
    }
}

//! Page preferences (theme + music flags) persisted in a key/value store.
//!
//! The browser build uses `localStorage`; tests and headless callers use
//! [`MemoryStore`]. Storage failures never reach the caller: reads fall back
//! to the default and writes are logged and dropped.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const THEME_KEY: &str = "theme";
pub const MUSIC_KEY: &str = "music";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local storage is not available in this browsing context")]
    Unavailable,
    #[error("storage backend rejected `{key}`: {reason}")]
    Backend { key: String, reason: String },
}

/// Minimal key/value backend.
pub trait KvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }
    fn clear(&mut self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// In-memory store. Used when `localStorage` is missing (private mode,
/// sandboxed iframes) and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
    fn clear(&mut self) -> Result<(), StorageError> {
        self.items.clear();
        Ok(())
    }
}

/// `window.localStorage` wrapper.
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

fn backend_err(key: &str, err: wasm_bindgen::JsValue) -> StorageError {
    StorageError::Backend {
        key: key.to_string(),
        reason: format!("{err:?}"),
    }
}

impl KvStore for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(|e| backend_err(key, e))
    }
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(|e| backend_err(key, e))
    }
    fn clear(&mut self) -> Result<(), StorageError> {
        self.storage.clear().map_err(|e| backend_err("*", e))
    }
}

/// Opens `localStorage`, falling back to a session-only memory store.
pub fn browser_store() -> Box<dyn KvStore> {
    match LocalStorage::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("{e}; preferences will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

// --- Typed flags -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MusicPref {
    On,
    #[default]
    Off,
}

impl MusicPref {
    pub fn as_str(self) -> &'static str {
        match self {
            MusicPref::On => "on",
            MusicPref::Off => "off",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised preference value `{0}`")]
pub struct ParsePrefError(String);

impl FromStr for Theme {
    type Err = ParsePrefError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(ParsePrefError(other.to_string())),
        }
    }
}

impl FromStr for MusicPref {
    type Err = ParsePrefError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(MusicPref::On),
            "off" => Ok(MusicPref::Off),
            other => Err(ParsePrefError(other.to_string())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MusicPref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Store facade ------------------------------------------------------------

pub struct Preferences<S: KvStore> {
    store: S,
}

impl<S: KvStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        log::debug!("preference store ready");
        Self { store }
    }

    /// Raw read; absence and backend errors both yield `default`.
    pub fn get(&self, key: &str, default: &str) -> String {
        match self.store.get_item(key) {
            Ok(Some(v)) => v,
            Ok(None) => default.to_string(),
            Err(e) => {
                log::warn!("reading `{key}` failed: {e}");
                default.to_string()
            }
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set_item(key, value) {
            log::warn!("writing `{key}` failed: {e}");
        }
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear() {
            log::warn!("clearing preferences failed: {e}");
        }
    }

    fn typed<T: FromStr<Err = ParsePrefError> + Default + Copy>(&self, key: &str) -> T {
        let fallback = T::default();
        match self.store.get_item(key) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e: ParsePrefError| {
                log::warn!("`{key}`: {e}; using default");
                fallback
            }),
            Ok(None) => fallback,
            Err(e) => {
                log::warn!("reading `{key}` failed: {e}");
                fallback
            }
        }
    }

    pub fn theme(&self) -> Theme {
        self.typed(THEME_KEY)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.set(THEME_KEY, theme.as_str());
    }

    pub fn music(&self) -> MusicPref {
        self.typed(MUSIC_KEY)
    }

    pub fn set_music(&mut self, music: MusicPref) {
        self.set(MUSIC_KEY, music.as_str());
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Backend { key: key.into(), reason: "quota".into() })
        }
        fn set_item(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend { key: key.into(), reason: "quota".into() })
        }
        fn clear(&mut self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }
    }

    #[test]
    fn defaults_when_empty() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.theme(), Theme::Dark);
        assert_eq!(prefs.music(), MusicPref::Off);
        assert_eq!(prefs.get("missing", "fallback"), "fallback");
    }

    #[test]
    fn garbage_value_reads_as_default() {
        let mut store = MemoryStore::new();
        store.set_item(THEME_KEY, "sepia").unwrap();
        store.set_item(MUSIC_KEY, "loud").unwrap();
        let prefs = Preferences::new(store);
        assert_eq!(prefs.theme(), Theme::Dark);
        assert_eq!(prefs.music(), MusicPref::Off);
    }

    #[test]
    fn broken_backend_never_surfaces() {
        let mut prefs = Preferences::new(BrokenStore);
        prefs.set_theme(Theme::Light);
        prefs.clear();
        assert_eq!(prefs.theme(), Theme::Dark);
        assert_eq!(prefs.get(MUSIC_KEY, "off"), "off");
    }

    #[test]
    fn boxed_store_delegates() {
        let mut prefs: Preferences<Box<dyn KvStore>> = Preferences::new(Box::new(MemoryStore::new()));
        prefs.set_music(MusicPref::On);
        assert_eq!(prefs.music(), MusicPref::On);
    }
}

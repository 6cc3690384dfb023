//! Durable key-value snapshots of the profile, transcript, selection and
//! layout preference.
//!
//! Reads never fail the caller: a missing or unreadable entry yields its default.
//! Writes are best effort and not transactional across keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationLog;
use crate::error::{Result, SheenError};
use crate::model::UserProfile;
use crate::selection::Selection;

pub const KEY_CHAT_HISTORY: &str = "chat_history";
pub const KEY_USER_PROFILE: &str = "user_profile";
pub const KEY_SELECTED_PRODUCTS: &str = "selected_products";
pub const KEY_LANGUAGE_DIRECTION: &str = "language_direction";

/// Minimal string-valued storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

// -- FileStore --

/// One `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SheenError::Persistence(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            SheenError::Persistence(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        let path = self.path_for(key);
        // Write to a sibling then rename so a crash never leaves half a snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| {
            SheenError::Persistence(format!("failed to write {}: {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            SheenError::Persistence(format!("failed to replace {}: {e}", path.display()))
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SheenError::Persistence(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

// -- MemoryStore --

/// In-process map. With a quota set, writes that would push the total
/// key + value bytes past it fail the way a full browser storage does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| SheenError::Persistence("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(SheenError::Persistence(format!(
                    "quota exceeded writing '{key}' ({needed} > {quota} bytes)"
                )));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// -- Direction --

/// Text layout preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ltr => Self::Rtl,
            Self::Rtl => Self::Ltr,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ltr" => Ok(Self::Ltr),
            "rtl" => Ok(Self::Rtl),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

// -- ProfileStore --

/// Typed, fail-soft access to the snapshot keys.
pub struct ProfileStore<S> {
    store: S,
}

impl<S: KeyValueStore> ProfileStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Profile and transcript. Missing or malformed entries come back empty.
    pub fn load(&self) -> (UserProfile, ConversationLog) {
        let profile: UserProfile = self.read_json(KEY_USER_PROFILE);
        let log: ConversationLog = self.read_json(KEY_CHAT_HISTORY);
        (profile, log)
    }

    /// Persist the profile and the newest [`RETENTION_LIMIT`](crate::conversation::RETENTION_LIMIT)
    /// log entries. The in-memory log is not trimmed.
    pub fn save(&self, profile: &UserProfile, log: &ConversationLog) {
        self.write_json(KEY_CHAT_HISTORY, log.retained());
        self.write_json(KEY_USER_PROFILE, profile);
    }

    pub fn clear(&self) {
        for key in [KEY_CHAT_HISTORY, KEY_USER_PROFILE] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, "failed to clear snapshot: {e}");
            }
        }
    }

    pub fn load_selection(&self) -> Selection {
        self.read_json(KEY_SELECTED_PRODUCTS)
    }

    pub fn save_selection(&self, selection: &Selection) {
        self.write_json(KEY_SELECTED_PRODUCTS, selection);
    }

    pub fn load_direction(&self) -> Direction {
        match self.store.get(KEY_LANGUAGE_DIRECTION) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("ignoring stored direction: {e}");
                Direction::default()
            }),
            Ok(None) => Direction::default(),
            Err(e) => {
                tracing::warn!("failed to read direction: {e}");
                Direction::default()
            }
        }
    }

    pub fn save_direction(&self, direction: Direction) {
        if let Err(e) = self.store.set(KEY_LANGUAGE_DIRECTION, direction.as_str()) {
            tracing::warn!("failed to save direction: {e}");
        }
    }

    fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get(key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(key, "discarding malformed snapshot: {e}");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, "failed to read snapshot: {e}");
                T::default()
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "failed to serialize snapshot: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw) {
            tracing::warn!(key, "failed to save snapshot: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Concern, Message, MessageContext, Product};

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sheen-store-{tag}-{}", std::process::id()))
    }

    fn chatty_log(n: usize) -> ConversationLog {
        let mut log = ConversationLog::new();
        for i in 0..n {
            log.push(Message::user(format!("m{i}"), MessageContext::GeneralChat));
        }
        log
    }

    #[test]
    fn test_empty_store_loads_defaults() {
        let store = ProfileStore::new(MemoryStore::new());
        let (profile, log) = store.load();
        assert_eq!(profile, UserProfile::default());
        assert!(log.is_empty());
        assert!(store.load_selection().is_empty());
        assert_eq!(store.load_direction(), Direction::Ltr);
    }

    #[test]
    fn test_malformed_json_yields_defaults() {
        let kv = MemoryStore::new();
        kv.set(KEY_USER_PROFILE, "{not json").unwrap();
        kv.set(KEY_CHAT_HISTORY, "42").unwrap();
        kv.set(KEY_SELECTED_PRODUCTS, "[{\"id\": \"x\"}]").unwrap();
        kv.set(KEY_LANGUAGE_DIRECTION, "sideways").unwrap();
        let store = ProfileStore::new(kv);

        let (profile, log) = store.load();
        assert_eq!(profile, UserProfile::default());
        assert!(log.is_empty());
        assert!(store.load_selection().is_empty());
        assert_eq!(store.load_direction(), Direction::Ltr);
    }

    #[test]
    fn test_save_keeps_last_fifty() {
        let store = ProfileStore::new(MemoryStore::new());
        let log = chatty_log(60);
        store.save(&UserProfile::default(), &log);

        let (_, loaded) = store.load();
        assert_eq!(loaded.len(), 50);
        assert_eq!(loaded.messages()[0].content, "m10");
        assert_eq!(loaded.messages()[49].content, "m59");
        assert_eq!(log.len(), 60);
    }

    #[test]
    fn test_profile_roundtrip_and_clear() {
        let store = ProfileStore::new(MemoryStore::new());
        let profile = UserProfile {
            name: Some("Amira".into()),
            concerns: vec![Concern::Acne],
            total_messages: 3,
            ..Default::default()
        };
        store.save(&profile, &chatty_log(2));
        let (loaded, log) = store.load();
        assert_eq!(loaded, profile);
        assert_eq!(log.len(), 2);

        store.clear();
        let (loaded, log) = store.load();
        assert_eq!(loaded, UserProfile::default());
        assert!(log.is_empty());
    }

    #[test]
    fn test_quota_exceeded_is_swallowed() {
        let store = ProfileStore::new(MemoryStore::with_quota(64));
        store.save(&UserProfile::default(), &chatty_log(20));
        // The transcript did not fit; nothing of it was written.
        assert!(store.inner().get(KEY_CHAT_HISTORY).unwrap().is_none());
        let (_, log) = store.load();
        assert!(log.is_empty());
    }

    #[test]
    fn test_quota_counts_replacement_not_old_value() {
        let kv = MemoryStore::with_quota(20);
        kv.set("k", "0123456789").unwrap();
        kv.set("k", "9876543210").unwrap();
        assert!(kv.set("other", "0123456789").is_err());
    }

    #[test]
    fn test_selection_and_direction_roundtrip() {
        let store = ProfileStore::new(MemoryStore::new());
        let mut selection = Selection::new();
        selection.toggle(&Product {
            id: 5,
            name: "Elvive Shampoo".into(),
            brand: "L'Oréal Paris".into(),
            category: "haircare".into(),
            description: String::new(),
            image: String::new(),
        });
        store.save_selection(&selection);
        store.save_direction(Direction::Rtl);

        assert_eq!(store.load_selection(), selection);
        assert_eq!(store.load_direction(), Direction::Rtl);
        assert_eq!(
            store.inner().get(KEY_LANGUAGE_DIRECTION).unwrap().as_deref(),
            Some("rtl")
        );
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = temp_dir("file");
        let _ = std::fs::remove_dir_all(&dir);
        let kv = FileStore::new(&dir);
        assert!(kv.get("missing").unwrap().is_none());

        kv.set("user_profile", "{\"name\":\"Amira\"}").unwrap();
        assert!(dir.join("user_profile.json").exists());
        assert_eq!(
            kv.get("user_profile").unwrap().as_deref(),
            Some("{\"name\":\"Amira\"}")
        );

        kv.remove("user_profile").unwrap();
        kv.remove("user_profile").unwrap();
        assert!(kv.get("user_profile").unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_direction_toggle() {
        assert_eq!(Direction::Ltr.toggled(), Direction::Rtl);
        assert_eq!(Direction::Rtl.toggled(), Direction::Ltr);
        assert_eq!("RTL".parse::<Direction>().unwrap(), Direction::Rtl);
    }
}

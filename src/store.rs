// State store - persisted client-side key/value state
//
// The browser build keeps the auth token, the serialized user, the UI
// language, and the preferred API environment in localStorage. Here the
// same keys live in a small TOML file of string pairs. The store is an
// explicit value passed to whoever needs it, so tests can point it at a
// throwaway path instead of the real one.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Well-known keys
// ─────────────────────────────────────────────────────────────────────────────

/// Bearer token for the authenticated session
pub const AUTH_TOKEN: &str = "auth_token";
/// Serialized user object (JSON), restored on startup
pub const AUTH_USER: &str = "auth_user";
/// Chosen UI language
pub const UI_LANGUAGE: &str = "ui_language";
/// Chosen spoken-language/voice preference
pub const VOICE_LANGUAGE: &str = "voice_language";
/// Runtime API environment preference, set by an explicit switch
pub const PREFERRED_ENV: &str = "preferred_api_environment";

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed key/value store for persisted client state
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by the given file (created lazily on first write)
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default state file path: ~/.config/ptg-chat/state.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("ptg-chat").join("state.toml"))
    }

    /// Open the store at the default location
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path().context("Could not determine home directory")?;
        Ok(Self::new(path))
    }

    /// Read the whole map. A missing file is an empty store; a file that
    /// cannot be read or parsed is logged and treated as empty, since the
    /// state file is machine-written cache, not user configuration.
    fn read_map(&self) -> BTreeMap<String, String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Could not read state file {:?}: {}", self.path, e);
                return BTreeMap::new();
            }
        };

        match toml::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Malformed state file {:?}, ignoring: {}", self.path, e);
                BTreeMap::new()
            }
        }
    }

    /// Write the whole map back, creating parent directories as needed
    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory {:?}", parent))?;
        }
        let contents = toml::to_string(map).context("Failed to serialize state")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write state file {:?}", self.path))?;
        Ok(())
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<String> {
        self.read_map().get(key).cloned()
    }

    /// Set a key to a value, persisting immediately
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    /// Remove a key. No-op if the key is absent.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    /// Clear the authenticated session (token + user), called on logout.
    /// Language and environment preferences survive logout.
    pub fn clear_session(&self) -> Result<()> {
        let mut map = self.read_map();
        let removed = map.remove(AUTH_TOKEN).is_some() | map.remove(AUTH_USER).is_some();
        if removed {
            self.write_map(&map)?;
        }
        Ok(())
    }

    /// Stored bearer token, if a session was persisted
    pub fn auth_token(&self) -> Option<String> {
        self.get(AUTH_TOKEN)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Unique throwaway store path per test
    pub(crate) fn temp_store() -> StateStore {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "ptg-chat-test-{}-{}",
            std::process::id(),
            n
        ));
        StateStore::new(path.join("state.toml"))
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let store = temp_store();
        assert_eq!(store.get(AUTH_TOKEN), None);
    }

    #[test]
    fn test_set_get_roundtrip() {
        let store = temp_store();
        store.set(AUTH_TOKEN, "tok-123").unwrap();
        store.set(UI_LANGUAGE, "en").unwrap();
        assert_eq!(store.get(AUTH_TOKEN).as_deref(), Some("tok-123"));
        assert_eq!(store.get(UI_LANGUAGE).as_deref(), Some("en"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = temp_store();
        store.set(PREFERRED_ENV, "staging").unwrap();
        store.remove(PREFERRED_ENV).unwrap();
        store.remove(PREFERRED_ENV).unwrap();
        assert_eq!(store.get(PREFERRED_ENV), None);
    }

    #[test]
    fn test_clear_session_keeps_preferences() {
        let store = temp_store();
        store.set(AUTH_TOKEN, "tok").unwrap();
        store.set(AUTH_USER, "{\"id\":\"1\"}").unwrap();
        store.set(PREFERRED_ENV, "production").unwrap();
        store.set(UI_LANGUAGE, "ar").unwrap();

        store.clear_session().unwrap();

        assert_eq!(store.get(AUTH_TOKEN), None);
        assert_eq!(store.get(AUTH_USER), None);
        assert_eq!(store.get(PREFERRED_ENV).as_deref(), Some("production"));
        assert_eq!(store.get(UI_LANGUAGE).as_deref(), Some("ar"));
    }
}

//! API environment registry and resolution
//!
//! Exactly one environment is active per process. Resolution is deterministic
//! given three precedence-ordered sources:
//! 1. Explicit override base URL (`PTG_API_BASE_URL`) - wins unconditionally
//!    and clears any persisted runtime preference so a stale preference cannot
//!    resurrect after an override is introduced
//! 2. Runtime-persisted preference (set by an explicit environment switch),
//!    valid only if it names a known environment
//! 3. Deploy-time default (`PTG_API_ENV`), falling back to "test"

use crate::store::{StateStore, PREFERRED_ENV};

/// Env var carrying an explicit override base URL (highest precedence)
pub const OVERRIDE_URL_VAR: &str = "PTG_API_BASE_URL";
/// Env var naming the deploy-time default environment
pub const DEFAULT_ENV_VAR: &str = "PTG_API_ENV";
/// Hardcoded fallback when the deploy default is unset or unrecognized
pub const FALLBACK_ENV: &str = "test";

/// A backend environment the client can target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEnvironment {
    /// Stable lookup key ("development", "test", ...) or "custom"
    pub key: String,
    /// Human-readable name
    pub name: String,
    /// Base URL all endpoint paths are appended to
    pub base_url: String,
    /// Per-request timeout for ordinary calls, in milliseconds
    pub timeout_ms: u64,
    pub description: String,
}

impl ApiEnvironment {
    fn known(key: &str, name: &str, base_url: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            timeout_ms: 30_000,
            description: description.to_string(),
        }
    }

    /// Dynamically constructed entry for an explicit override base URL
    pub fn custom(base_url: &str) -> Self {
        Self {
            key: "custom".to_string(),
            name: "Custom".to_string(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout_ms: 30_000,
            description: "Custom base URL from environment variable".to_string(),
        }
    }
}

/// The fixed set of known environments, in display order
pub fn known_environments() -> Vec<ApiEnvironment> {
    vec![
        ApiEnvironment::known(
            "development",
            "Development",
            "http://localhost:8000",
            "Local development environment",
        ),
        ApiEnvironment::known(
            "test",
            "Test",
            "https://test.pro-traders-group.com",
            "Pro Traders Group test environment",
        ),
        ApiEnvironment::known(
            "staging",
            "Staging",
            "https://staging.pro-traders-group.com",
            "Pro Traders Group staging environment",
        ),
        ApiEnvironment::known(
            "production",
            "Production",
            "https://pro-traders-group.com",
            "Pro Traders Group production environment",
        ),
        ApiEnvironment::known(
            "mock",
            "Mock API",
            "mock://localhost",
            "Mock API for testing (when the real API has issues)",
        ),
    ]
}

/// Look up a known environment by key
pub fn find_environment(key: &str) -> Option<ApiEnvironment> {
    known_environments().into_iter().find(|e| e.key == key)
}

/// Resolve the active environment from the process environment and the store
pub fn resolve_api_config(store: &StateStore) -> ApiEnvironment {
    let override_url = std::env::var(OVERRIDE_URL_VAR).ok();
    let deploy_default = std::env::var(DEFAULT_ENV_VAR).ok();
    resolve_with(override_url.as_deref(), store, deploy_default.as_deref())
}

/// Resolution core, with all three sources passed in explicitly.
///
/// Side effect: a non-blank override clears the persisted preference key.
pub fn resolve_with(
    override_url: Option<&str>,
    store: &StateStore,
    deploy_default: Option<&str>,
) -> ApiEnvironment {
    // 1. Explicit override wins unconditionally
    if let Some(url) = override_url {
        if !url.trim().is_empty() {
            if let Err(e) = store.remove(PREFERRED_ENV) {
                tracing::warn!("Could not clear stale environment preference: {}", e);
            }
            tracing::info!("Using custom API base URL override: {}", url.trim());
            return ApiEnvironment::custom(url);
        }
    }

    // 2. Runtime-persisted preference, only if it names a known environment
    if let Some(preferred) = store.get(PREFERRED_ENV) {
        if let Some(env) = find_environment(&preferred) {
            tracing::debug!("Using persisted environment preference: {}", preferred);
            return env;
        }
        tracing::warn!("Ignoring unrecognized environment preference: {}", preferred);
    }

    // 3. Deploy-time default, falling back to "test"
    let default_key = deploy_default.unwrap_or(FALLBACK_ENV);
    find_environment(default_key).unwrap_or_else(|| {
        find_environment(FALLBACK_ENV).unwrap_or_else(|| {
            // FALLBACK_ENV is in the known set; this branch is unreachable
            ApiEnvironment::custom("http://localhost:8000")
        })
    })
}

/// Persist a runtime environment preference.
///
/// Returns false with no side effect if `name` is not a known key. On
/// success the preference takes effect on the next invocation - there is no
/// live in-place reconfiguration, so in-flight requests never observe a
/// mixed configuration (the browser build forces a full page reload here).
pub fn switch_environment(store: &StateStore, name: &str) -> bool {
    if find_environment(name).is_none() {
        let known: Vec<String> = known_environments().into_iter().map(|e| e.key).collect();
        tracing::error!("Environment '{}' not found. Available: {:?}", name, known);
        return false;
    }

    if let Err(e) = store.set(PREFERRED_ENV, name) {
        tracing::error!("Could not persist environment preference: {}", e);
        return false;
    }

    tracing::info!("Switched preferred environment to '{}'", name);
    true
}

/// Clear the persisted preference, reverting to the deploy-time default
pub fn reset_to_default(store: &StateStore) {
    if let Err(e) = store.remove(PREFERRED_ENV) {
        tracing::error!("Could not clear environment preference: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;

    #[test]
    fn test_default_resolution_falls_back_to_test() {
        let store = temp_store();
        let env = resolve_with(None, &store, None);
        assert_eq!(env.key, "test");

        // Unrecognized deploy default also lands on "test"
        let env = resolve_with(None, &store, Some("qa-cluster"));
        assert_eq!(env.key, "test");
    }

    #[test]
    fn test_deploy_default_respected_when_known() {
        let store = temp_store();
        let env = resolve_with(None, &store, Some("staging"));
        assert_eq!(env.key, "staging");
        assert_eq!(env.base_url, "https://staging.pro-traders-group.com");
    }

    #[test]
    fn test_persisted_preference_beats_deploy_default() {
        let store = temp_store();
        assert!(switch_environment(&store, "production"));
        let env = resolve_with(None, &store, Some("development"));
        assert_eq!(env.key, "production");
    }

    #[test]
    fn test_invalid_preference_is_ignored() {
        let store = temp_store();
        store.set(PREFERRED_ENV, "no-such-env").unwrap();
        let env = resolve_with(None, &store, None);
        assert_eq!(env.key, "test");
    }

    #[test]
    fn test_override_wins_and_clears_preference() {
        let store = temp_store();
        assert!(switch_environment(&store, "production"));

        let env = resolve_with(Some("https://api.example.com/"), &store, Some("development"));
        assert_eq!(env.key, "custom");
        assert_eq!(env.base_url, "https://api.example.com");

        // The stale preference is gone: without the override we resolve to
        // the deploy default again, not production
        let env = resolve_with(None, &store, Some("development"));
        assert_eq!(env.key, "development");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let store = temp_store();
        assert!(switch_environment(&store, "staging"));
        let env = resolve_with(Some("   "), &store, None);
        assert_eq!(env.key, "staging");
    }

    #[test]
    fn test_switch_unknown_environment_is_rejected() {
        let store = temp_store();
        assert!(!switch_environment(&store, "qa"));
        assert_eq!(store.get(PREFERRED_ENV), None);
    }

    #[test]
    fn test_reset_clears_preference() {
        let store = temp_store();
        assert!(switch_environment(&store, "mock"));
        reset_to_default(&store);
        assert_eq!(store.get(PREFERRED_ENV), None);
    }
}

//! Configuration for the chat client
//!
//! Two layers live here, deliberately separate:
//! - The API environment registry and its precedence-ordered resolution
//!   (override > persisted preference > deploy default), in `environments`
//! - Ambient client configuration loaded in order of precedence:
//!   1. Environment variables (highest priority)
//!   2. Config file (~/.config/ptg-chat/config.toml)
//!   3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

pub mod endpoints;
pub mod environments;
pub mod probe;

pub use endpoints::Endpoints;
pub use environments::{
    find_environment, known_environments, reset_to_default, resolve_api_config,
    switch_environment, ApiEnvironment,
};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Ambient client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Timeout for ordinary API calls, in seconds (health probes carry
    /// their own tighter bounds)
    pub request_timeout_secs: u64,

    /// Sidebar page size for local history pagination
    pub page_size: usize,

    /// Debounce window for sidebar search, in milliseconds
    pub search_debounce_ms: u64,

    /// Default toast lifetime, in seconds
    pub toast_duration_secs: u64,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Write JSON logs to a daily-rotated file (keeps the REPL's stdout clean)
    pub file_enabled: bool,
    /// Directory for log files
    pub file_dir: PathBuf,
    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: true,
            file_dir: PathBuf::from("./logs"),
            file_prefix: "ptg-chat".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            page_size: 10,
            search_debounce_ms: 400,
            toast_duration_secs: 5,
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub request_timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
    pub search_debounce_ms: Option<u64>,
    pub toast_duration_secs: Option<u64>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<String>,
    pub file_prefix: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/ptg-chat/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("ptg-chat").join("config.toml"))
    }

    /// Create a config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed fails fast with a
    /// clear error rather than silently falling back to defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: failed to parse config file {}", path.display());
                    eprintln!("  {}", e);
                    eprintln!("  To reset, delete the file and restart ptg-chat.");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("Error: cannot read config file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        let file = Self::load_file_config();
        let defaults = Config::default();

        // Request timeout: env > file > default
        let request_timeout_secs = std::env::var("PTG_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.request_timeout_secs)
            .unwrap_or(defaults.request_timeout_secs);

        // Page size: file > default
        let page_size = file.page_size.unwrap_or(defaults.page_size);

        // Search debounce: file > default
        let search_debounce_ms = file
            .search_debounce_ms
            .unwrap_or(defaults.search_debounce_ms);

        // Toast duration: file > default
        let toast_duration_secs = file
            .toast_duration_secs
            .unwrap_or(defaults.toast_duration_secs);

        let file_logging = file.logging.unwrap_or_default();
        let logging = LoggingConfig {
            level: std::env::var("PTG_LOG_LEVEL")
                .ok()
                .or(file_logging.level)
                .unwrap_or_else(|| "info".to_string()),
            file_enabled: file_logging.file_enabled.unwrap_or(true),
            file_dir: file_logging
                .file_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs")),
            file_prefix: file_logging
                .file_prefix
                .unwrap_or_else(|| "ptg-chat".to_string()),
        };

        Self {
            request_timeout_secs,
            page_size,
            search_debounce_ms,
            toast_duration_secs,
            logging,
        }
    }

    /// Serialize the effective configuration as a commented TOML template.
    /// Single source of truth for `ensure_config_exists` and `config --show`.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# ptg-chat configuration
# Precedence: environment variables > this file > built-in defaults

# Timeout for ordinary API calls, in seconds
request_timeout_secs = {timeout}

# Sidebar page size for local history pagination
page_size = {page_size}

# Debounce window for sidebar search, in milliseconds
search_debounce_ms = {debounce}

# Default toast lifetime, in seconds
toast_duration_secs = {toast}

[logging]
# Log level: trace, debug, info, warn, error
level = "{level}"
# Write JSON logs to a daily-rotated file
file_enabled = {file_enabled}
file_dir = "{file_dir}"
file_prefix = "{file_prefix}"
"#,
            timeout = self.request_timeout_secs,
            page_size = self.page_size,
            debounce = self.search_debounce_ms,
            toast = self.toast_duration_secs,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            file_prefix = self.logging.file_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that the serialized config template parses back cleanly
    #[test]
    fn test_config_roundtrip_default() {
        let config = Config::default();
        let toml_str = config.to_toml();

        let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
        assert!(
            parsed.is_ok(),
            "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
            toml_str,
            parsed.err()
        );

        let file = parsed.unwrap();
        assert_eq!(file.request_timeout_secs, Some(30));
        assert_eq!(file.page_size, Some(10));
        assert_eq!(file.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn test_partial_file_config_parses() {
        let file: FileConfig = toml::from_str(
            r#"
            page_size = 25

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(file.page_size, Some(25));
        assert_eq!(file.request_timeout_secs, None);
        assert_eq!(file.logging.unwrap().level.as_deref(), Some("debug"));
    }
}

//! # Application Configuration
//!
//! Loads `keyscope.toml`:
//!
//! ```toml
//! [detector]
//! magic_min_length = 32
//!
//! [materializer]
//! max_depth = 50
//! max_nodes = 100000
//!
//! [log]
//! format = "text"   # or "json"
//! ```
//!
//! Lookup order: `--config <path>`, then `$KEYSCOPE_CONFIG`, then
//! `./keyscope.toml` when it exists, then built-in defaults. Unknown keys are
//! rejected.

use keyscope_core::{DetectorConfig, InspectConfig, KeyscopeError, MaterializeOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "KEYSCOPE_CONFIG";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "keyscope.toml";

/// Largest configuration file accepted (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// LOG SETTINGS
// =============================================================================

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `KEYSCOPE_LOG_FORMAT` value. Anything but `json` is text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// The `[log]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Everything `keyscope.toml` can set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub materializer: MaterializeOptions,
    pub log: LogConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, KeyscopeError> {
        toml::from_str(text).map_err(|e| KeyscopeError::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, KeyscopeError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            KeyscopeError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(KeyscopeError::Config(format!(
                "'{}' exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            KeyscopeError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| KeyscopeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// The file the lookup order selects, if any.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        config_path(explicit, env_path, Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from a resolved path, or defaults when there is none.
    pub fn load_resolved(path: Option<&Path>) -> Result<Self, KeyscopeError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Load following the lookup order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, KeyscopeError> {
        Self::load_resolved(Self::resolve_path(explicit).as_deref())
    }

    /// Apply command-line overrides on top of file values.
    pub fn apply_overrides(&mut self, max_depth: Option<usize>, magic_min_length: Option<usize>) {
        if let Some(max_depth) = max_depth {
            self.materializer.max_depth = max_depth;
        }
        if let Some(magic_min_length) = magic_min_length {
            self.detector.magic_min_length = magic_min_length;
        }
    }

    /// The core part of the configuration.
    #[must_use]
    pub fn inspect_config(&self) -> InspectConfig {
        InspectConfig {
            detector: self.detector.clone(),
            materializer: self.materializer,
        }
    }
}

/// Pick the configuration file. An explicit path or the environment variable
/// is used even if missing, so a typo is reported; the working directory
/// default only when present.
fn config_path(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    local_default: &Path,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(env_path)
        .or_else(|| local_default.is_file().then(|| local_default.to_path_buf()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.inspect_config(), InspectConfig::default());
    }

    #[test]
    fn sections_are_read() {
        let config = AppConfig::from_toml_str(
            "[detector]\nmagic_min_length = 8\n\n[materializer]\nmax_depth = 12\n\n[log]\nformat = \"json\"\n",
        )
        .expect("parse");
        assert_eq!(config.detector.magic_min_length, 8);
        assert_eq!(config.materializer.max_depth, 12);
        assert_eq!(config.materializer.max_nodes, 100_000);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("[materializer]\ndepth = 3\n").expect_err("unknown");
        assert!(matches!(err, KeyscopeError::Config(_)));
        assert!(AppConfig::from_toml_str("colour = true\n").is_err());
    }

    #[test]
    fn overrides_win() {
        let mut config = AppConfig::from_toml_str("[materializer]\nmax_depth = 12\n").expect("parse");
        config.apply_overrides(Some(3), None);
        assert_eq!(config.materializer.max_depth, 3);
        assert_eq!(config.detector.magic_min_length, 32);
        config.apply_overrides(None, Some(4));
        assert_eq!(config.detector.magic_min_length, 4);
    }

    #[test]
    fn lookup_order() {
        let missing = Path::new("/nonexistent/keyscope.toml");
        assert_eq!(
            config_path(Some(Path::new("a.toml")), Some(PathBuf::from("b.toml")), missing),
            Some(PathBuf::from("a.toml"))
        );
        assert_eq!(
            config_path(None, Some(PathBuf::from("b.toml")), missing),
            Some(PathBuf::from("b.toml"))
        );
        assert_eq!(config_path(None, None, missing), None);
    }

    #[test]
    fn resolution_is_separate_from_loading() {
        let explicit = Path::new("/nonexistent/keyscope.toml");
        assert_eq!(
            AppConfig::resolve_path(Some(explicit)),
            Some(explicit.to_path_buf())
        );
        let config = AppConfig::load_resolved(None).expect("defaults");
        assert_eq!(config.materializer.max_depth, 50);
        assert!(AppConfig::load_resolved(Some(explicit)).is_err());
    }

    #[test]
    fn log_format_env_values() {
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value("pretty"), LogFormat::Text);
    }
}

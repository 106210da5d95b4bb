//! Build configuration.
//!
//! Read from `buildsense.toml` at the project root and overlaid with the
//! settings the editor sends. [`crate::Orchestrator::reload_config`] is the
//! only point where a new configuration takes effect.
//!
//! # Example
//!
//! ```toml
//! fastRebuild = true
//! buildCommand = "fnc build --report json"
//! checkCommand = "fnc check --report json"
//! queryCommand = "fnc query"
//! timeoutSecs = 60
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "buildsense.toml";

/// Key under which editors nest the settings (`buildsense.fastRebuild`).
const SETTINGS_SECTION: &str = "buildsense";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    /// Run a quick build of the saved file on every save.
    #[serde(alias = "fast_rebuild")]
    pub fast_rebuild: bool,
    /// Full project build command line.
    #[serde(alias = "build_command")]
    pub build_command: String,
    /// Single-file check command line; the file path is appended. Falls
    /// back to `build_command`.
    #[serde(alias = "check_command", skip_serializing_if = "Option::is_none")]
    pub check_command: Option<String>,
    /// Query command line for hover, completion, definition and symbols.
    #[serde(alias = "query_command", skip_serializing_if = "Option::is_none")]
    pub query_command: Option<String>,
    /// Upper bound for one tool invocation.
    #[serde(alias = "timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            fast_rebuild: true,
            build_command: "make".to_string(),
            check_command: None,
            query_command: None,
            timeout_secs: 120,
        }
    }
}

impl BuildConfig {
    /// Load `buildsense.toml` from `root`. A missing file yields defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(BuildConfig::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Overlay editor settings. Accepts the settings either flat or nested
    /// under a `buildsense` key; absent keys keep their current value.
    pub fn overlay(&self, settings: &serde_json::Value) -> Result<Self, ConfigError> {
        let settings = settings.get(SETTINGS_SECTION).unwrap_or(settings);
        let Some(overrides) = settings.as_object() else {
            return Ok(self.clone());
        };

        let mut merged = serde_json::to_value(self)?;
        if let Some(base) = merged.as_object_mut() {
            for (key, value) in overrides {
                if !value.is_null() {
                    base.insert(camel_case(key), value.clone());
                }
            }
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Command line for a single-file check.
    pub fn quick_command(&self) -> &str {
        self.check_command.as_deref().unwrap_or(&self.build_command)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `timeout_secs` -> `timeoutSecs`, so snake_case settings do not collide
/// with the camelCase keys of the serialized base.
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = BuildConfig::load(dir.path()).expect("load");
        assert_eq!(config, BuildConfig::default());
        assert!(config.fast_rebuild);
    }

    #[test]
    fn reads_camel_and_snake_case_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut f = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).expect("create");
        writeln!(f, "fastRebuild = false").unwrap();
        writeln!(f, "build_command = \"fnc build\"").unwrap();
        writeln!(f, "timeoutSecs = 5").unwrap();
        drop(f);

        let config = BuildConfig::load(dir.path()).expect("load");
        assert!(!config.fast_rebuild);
        assert_eq!(config.build_command, "fnc build");
        assert_eq!(config.quick_command(), "fnc build");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "fastRebuild = [").unwrap();
        let err = BuildConfig::load(dir.path()).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn overlay_nested_settings() {
        let base = BuildConfig::default();
        let merged = base
            .overlay(&serde_json::json!({
                "buildsense": { "fastRebuild": false, "checkCommand": "fnc check", "queryCommand": null }
            }))
            .expect("overlay");
        assert!(!merged.fast_rebuild);
        assert_eq!(merged.build_command, "make");
        assert_eq!(merged.quick_command(), "fnc check");
        assert_eq!(merged.query_command, None);
    }

    #[test]
    fn overlay_accepts_snake_case_keys() {
        let merged = BuildConfig::default()
            .overlay(&serde_json::json!({ "timeout_secs": 9 }))
            .expect("overlay");
        assert_eq!(merged.timeout_secs, 9);
        assert_eq!(camel_case("fast_rebuild"), "fastRebuild");
    }

    #[test]
    fn overlay_ignores_non_objects_and_rejects_bad_types() {
        let base = BuildConfig::default();
        assert_eq!(base.overlay(&serde_json::Value::Null).unwrap(), base);
        assert!(base
            .overlay(&serde_json::json!({ "fastRebuild": "yes" }))
            .is_err());
    }
}

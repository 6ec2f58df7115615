use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::errors::{ConfigError, Result};
use crate::js_module::{self, ModuleSyntax};
use crate::plugin::PluginRef;

/// File names probed, in order, when no configuration path is given
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "tailwind.config.js",
    "tailwind.config.cjs",
    "tailwind.config.mjs",
    "tailwind.config.ts",
    "tailwind.config.json",
    "tailwind.config.yaml",
    "tailwind.config.yml",
];

/// Strategy used to find class usage in content files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Every content file is read on every build
    #[default]
    All,
    /// Only files changed since the previous scan are read again
    Jit,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::All => "all",
            ScanMode::Jit => "jit",
        }
    }

    pub fn is_incremental(&self) -> bool {
        matches!(self, ScanMode::Jit)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(ScanMode::All),
            "jit" => Ok(ScanMode::Jit),
            other => Err(ConfigError::invalid(format!(
                "unknown mode '{}', expected \"all\" or \"jit\"",
                other
            ))),
        }
    }
}

/// Tailwind configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailwindConfig {
    /// Scanning strategy
    #[serde(default)]
    pub mode: ScanMode,

    /// Content paths to scan, in authored order
    pub content: Vec<String>,

    /// Theme configuration
    #[serde(default)]
    pub theme: Theme,

    /// Plugins registered with the generator, in authored order
    #[serde(default)]
    pub plugins: Vec<PluginRef>,
}

impl Default for TailwindConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::All,
            content: vec![
                "./src/**/*.{rs,html,css}".to_string(),
                "./dist/**/*.html".to_string(),
            ],
            theme: Theme::default(),
            plugins: vec![PluginRef::new("tailwind-scrollbar-hide")],
        }
    }
}

/// Theme configuration for Tailwind
///
/// Keys under `extend` are merged into the generator's defaults; any other
/// key replaces the default scale of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Theme extensions
    #[serde(default)]
    pub extend: IndexMap<String, Value>,

    /// Theme overrides
    #[serde(flatten)]
    pub overrides: IndexMap<String, Value>,
}

impl Theme {
    pub fn is_empty(&self) -> bool {
        self.extend.is_empty() && self.overrides.is_empty()
    }
}

impl TailwindConfig {
    /// Parse configuration from a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidConfig {
            message: format!("Failed to parse JSON config: {}", e),
        })
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidConfig {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    /// Parse configuration from a JavaScript or TypeScript module
    pub fn from_js_str(source: &str, source_name: &str, syntax: ModuleSyntax) -> Result<Self> {
        let document = js_module::parse_config_module(source, source_name, syntax)?;
        Self::from_value(document)
    }

    /// Build configuration from an already parsed document
    pub fn from_value(document: Value) -> Result<Self> {
        serde_json::from_value(document).map_err(|e| ConfigError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Read a configuration file into an untyped document (auto-detect format)
    pub fn read_document(path: &Path) -> Result<Value> {
        debug!("Loading Tailwind configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidConfig {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let name = path.display().to_string();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidConfig {
                message: format!("Failed to parse YAML config: {}", e),
            }),
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::InvalidConfig {
                message: format!("Failed to parse JSON config: {}", e),
            }),
            Some("js") | Some("cjs") | Some("mjs") => {
                js_module::parse_config_module(&content, &name, ModuleSyntax::JavaScript)
            }
            Some("ts") | Some("cts") | Some("mts") => {
                js_module::parse_config_module(&content, &name, ModuleSyntax::TypeScript)
            }
            _ => Err(ConfigError::UnsupportedFormat(name)),
        }
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        let document = Self::read_document(path)?;
        Self::from_value(document).map_err(|e| ConfigError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Find the configuration file in `dir`
    pub fn discover(dir: &Path) -> Result<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ConfigError::ConfigNotFound(dir.display().to_string()))
    }

    /// Load from an explicit path, or discover one in `dir`
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<(PathBuf, Self)> {
        let path = match explicit {
            Some(path) if path.is_relative() => dir.join(path),
            Some(path) => path.to_path_buf(),
            None => Self::discover(dir)?,
        };
        let config = Self::from_file(&path)?;
        info!(
            "Loaded {} ({} content patterns, {} plugins)",
            path.display(),
            config.content.len(),
            config.plugins.len()
        );
        Ok((path, config))
    }

    /// The configuration as a JSON document
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Merge with another configuration
    pub fn merge(mut self, other: Self) -> Self {
        self.mode = other.mode;

        // Merge content paths
        for path in other.content {
            if !self.content.contains(&path) {
                self.content.push(path);
            }
        }

        // Merge theme
        self.theme.extend.extend(other.theme.extend);
        self.theme.overrides.extend(other.theme.overrides);

        // Later plugins replace earlier registrations of the same module
        for plugin in other.plugins {
            match self.plugins.iter_mut().find(|p| p.module == plugin.module) {
                Some(existing) => *existing = plugin,
                None => self.plugins.push(plugin),
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = TailwindConfig::default();
        assert_eq!(config.mode, ScanMode::All);
        assert_eq!(
            config.content,
            vec!["./src/**/*.{rs,html,css}", "./dist/**/*.html"]
        );
        assert!(config.theme.extend.is_empty());
        assert_eq!(config.plugins, vec![PluginRef::new("tailwind-scrollbar-hide")]);
    }

    #[test]
    fn test_serialized_keys_are_exact() {
        let value = TailwindConfig::default().to_value();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["content", "mode", "plugins", "theme"]);
        assert!(value["theme"]["extend"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_yaml_config_loading() {
        let yaml_content = r##"
mode: jit
content:
  - "./src/**/*.rs"
  - "./index.html"
theme:
  extend:
    colors:
      primary: "#1a73e8"
  screens:
    sm: "480px"
plugins:
  - tailwind-scrollbar-hide
"##;

        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml_content.as_bytes()).unwrap();

        let config = TailwindConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, ScanMode::Jit);
        assert_eq!(config.content, vec!["./src/**/*.rs", "./index.html"]);
        assert_eq!(config.theme.extend["colors"]["primary"], "#1a73e8");
        assert_eq!(config.theme.overrides["screens"]["sm"], "480px");
        assert_eq!(config.plugins[0].module, "tailwind-scrollbar-hide");
    }

    #[test]
    fn test_json_config_loading() {
        let json_content = r##"{
  "mode": "all",
  "content": ["./src/**/*.{rs,html,css}", "./dist/**/*.html"],
  "theme": { "extend": {} },
  "plugins": ["tailwind-scrollbar-hide"]
}"##;

        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(json_content.as_bytes()).unwrap();

        let config = TailwindConfig::from_file(file.path()).unwrap();
        assert_eq!(config, TailwindConfig::default());
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let err = TailwindConfig::from_json_str(r#"{"content": ["a"], "purge": []}"#).unwrap_err();
        assert!(err.to_string().contains("purge"), "{}", err);
    }

    #[test]
    fn test_missing_content_is_rejected() {
        assert!(TailwindConfig::from_json_str(r#"{"mode": "all"}"#).is_err());
    }

    #[test]
    fn test_non_mapping_extend_is_rejected() {
        let err = TailwindConfig::from_json_str(r#"{"content": ["a"], "theme": {"extend": []}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".toml").unwrap();
        let err = TailwindConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_discover_prefers_js() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tailwind.config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("tailwind.config.js"), "module.exports = {}").unwrap();

        let found = TailwindConfig::discover(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("tailwind.config.js"));
    }

    #[test]
    fn test_discover_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            TailwindConfig::discover(dir.path()),
            Err(ConfigError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("jit".parse::<ScanMode>().unwrap(), ScanMode::Jit);
        assert_eq!("all".parse::<ScanMode>().unwrap(), ScanMode::All);
        assert!("purge".parse::<ScanMode>().is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base = TailwindConfig::default();
        base.theme.extend.insert("colors".to_string(), serde_json::json!({ "primary": "#111" }));

        let mut other = TailwindConfig::default();
        other.mode = ScanMode::Jit;
        other.content = vec!["./custom/**/*.rs".to_string(), "./dist/**/*.html".to_string()];
        other.theme.extend.insert("colors".to_string(), serde_json::json!({ "primary": "#222" }));
        other.plugins = vec![
            PluginRef::new("tailwind-scrollbar-hide").with_options(serde_json::json!({})),
            PluginRef::new("@tailwindcss/forms"),
        ];

        let merged = base.merge(other);
        assert_eq!(merged.mode, ScanMode::Jit);
        assert_eq!(
            merged.content,
            vec!["./src/**/*.{rs,html,css}", "./dist/**/*.html", "./custom/**/*.rs"]
        );
        assert_eq!(merged.theme.extend["colors"]["primary"], "#222");
        assert_eq!(merged.plugins.len(), 2);
        assert!(merged.plugins[0].options.is_some());
    }
}

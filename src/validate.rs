//! Schema checks for Tailwind configurations
//!
//! [`validate`] inspects a typed configuration; [`validate_document`] checks
//! the raw document shape before any typing happens, so it can report every
//! problem at once instead of stopping at the first deserialization error.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::config::TailwindConfig;
use crate::content::ContentPattern;
use crate::errors::{ConfigError, Result};

const DOCUMENT_KEYS: &[&str] = &["mode", "content", "theme", "plugins"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single finding, located by a dotted key path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", label, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        });
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// No errors (warnings allowed)
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Fail with every error message joined
    pub fn into_result(self) -> Result<()> {
        let errors: Vec<String> = self
            .errors()
            .map(|i| format!("{}: {}", i.path, i.message))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::invalid(errors.join("; ")))
        }
    }
}

/// Check a typed configuration
pub fn validate(config: &TailwindConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.content.is_empty() {
        report.error("content", "must list at least one glob pattern");
    }

    let mut seen = HashSet::new();
    let mut inclusions = 0;
    for (idx, raw) in config.content.iter().enumerate() {
        let path = format!("content[{}]", idx);
        match ContentPattern::parse(raw) {
            Ok(pattern) => {
                if !pattern.is_negated() {
                    inclusions += 1;
                }
            }
            Err(ConfigError::InvalidPattern { message, .. }) => report.error(&path, message),
            Err(e) => report.error(&path, e.to_string()),
        }
        if !seen.insert(raw.as_str()) {
            report.warning(&path, format!("duplicate pattern '{}'", raw));
        }
    }
    if !config.content.is_empty() && inclusions == 0 {
        report.warning("content", "only exclusion patterns are listed; no file will be scanned");
    }

    for key in config.theme.overrides.keys() {
        if config.theme.extend.contains_key(key) {
            report.warning(
                format!("theme.{}", key),
                "also present under theme.extend; the override replaces the default scale before extension",
            );
        }
    }

    let mut modules = HashSet::new();
    for (idx, plugin) in config.plugins.iter().enumerate() {
        let path = format!("plugins[{}]", idx);
        if plugin.module.trim().is_empty() {
            report.error(&path, "module specifier is empty");
            continue;
        }
        if !modules.insert(plugin.module.as_str()) {
            report.warning(&path, format!("plugin '{}' is registered more than once", plugin.module));
        }
    }

    report
}

/// Check the shape of a raw configuration document
pub fn validate_document(document: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(object) = document.as_object() else {
        report.error("<root>", "configuration must be an object");
        return report;
    };

    for key in DOCUMENT_KEYS {
        if !object.contains_key(*key) {
            report.error(*key, "missing key");
        }
    }
    for key in object.keys() {
        if !DOCUMENT_KEYS.contains(&key.as_str()) {
            report.error(key, "unexpected key");
        }
    }

    if let Some(mode) = object.get("mode") {
        match mode.as_str() {
            Some("all") | Some("jit") => {}
            Some(other) => report.error("mode", format!("unknown mode '{}'", other)),
            None => report.error("mode", "must be a string"),
        }
    }

    if let Some(content) = object.get("content") {
        match content.as_array() {
            Some(items) if items.is_empty() => report.error("content", "must list at least one glob pattern"),
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let path = format!("content[{}]", idx);
                    match item.as_str() {
                        Some(raw) => {
                            if let Err(e) = ContentPattern::parse(raw) {
                                report.error(&path, e.to_string());
                            }
                        }
                        None => report.error(&path, "must be a string"),
                    }
                }
            }
            None => report.error("content", "must be an array of glob patterns"),
        }
    }

    if let Some(theme) = object.get("theme") {
        match theme.as_object() {
            Some(theme) => match theme.get("extend") {
                Some(Value::Object(_)) => {}
                Some(_) => report.error("theme.extend", "must be a mapping"),
                None => report.error("theme.extend", "missing key"),
            },
            None => report.error("theme", "must be a mapping"),
        }
    }

    if let Some(plugins) = object.get("plugins") {
        match plugins.as_array() {
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let path = format!("plugins[{}]", idx);
                    match item {
                        Value::Null => report.error(&path, "must not be null"),
                        Value::String(_) => {}
                        Value::Object(plugin) if plugin.get("module").map_or(false, Value::is_string) => {}
                        _ => report.error(&path, "must be a module name or an object with a `module` string"),
                    }
                }
            }
            None => report.error("plugins", "must be an array"),
        }
    }

    report
}

/// Check that every plugin can be found from `base_dir`
pub fn check_plugins(config: &TailwindConfig, base_dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (idx, plugin) in config.plugins.iter().enumerate() {
        if let Err(e) = plugin.resolve(base_dir) {
            report.error(format!("plugins[{}]", idx), e.to_string());
        }
    }
    report
}

impl TailwindConfig {
    pub fn validate(&self) -> ValidationReport {
        validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRef;
    use serde_json::json;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate(&TailwindConfig::default());
        assert!(report.is_valid());
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_empty_content_is_an_error() {
        let mut config = TailwindConfig::default();
        config.content.clear();
        let report = validate(&config);
        assert!(!report.is_valid());
        assert_eq!(report.errors().next().unwrap().path, "content");
    }

    #[test]
    fn test_invalid_glob_is_located() {
        let mut config = TailwindConfig::default();
        config.content.push("./src/**/*.{rs,html".to_string());
        config.content.push("./dist/[a-".to_string());
        let report = validate(&config);
        let paths: Vec<&str> = report.errors().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["content[2]", "content[3]"]);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut config = TailwindConfig::default();
        config.content.push("./dist/**/*.html".to_string());
        config.plugins.push(PluginRef::new("tailwind-scrollbar-hide"));
        config.theme.extend.insert("colors".to_string(), json!({}));
        config.theme.overrides.insert("colors".to_string(), json!({}));

        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings().count(), 3);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_only_exclusions_warns() {
        let mut config = TailwindConfig::default();
        config.content = vec!["!./src/generated/**".to_string()];
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings().next().unwrap().path, "content");
    }

    #[test]
    fn test_empty_plugin_module() {
        let mut config = TailwindConfig::default();
        config.plugins.push(PluginRef::new("  "));
        let report = validate(&config);
        assert_eq!(report.errors().next().unwrap().path, "plugins[1]");
    }

    #[test]
    fn test_document_has_exact_keys() {
        let report = validate_document(&TailwindConfig::default().to_value());
        assert!(report.issues.is_empty(), "{:?}", report.issues);

        let report = validate_document(&json!({
            "content": ["./src/**/*.rs"],
            "theme": { "extend": {} },
            "plugins": [],
            "darkMode": "class"
        }));
        let messages: Vec<String> = report.errors().map(|i| i.to_string()).collect();
        assert_eq!(messages, vec!["error: mode: missing key", "error: darkMode: unexpected key"]);
    }

    #[test]
    fn test_document_shapes() {
        let report = validate_document(&json!({
            "mode": "purge",
            "content": [],
            "theme": { "extend": [] },
            "plugins": [null, "tailwind-scrollbar-hide", { "options": {} }]
        }));
        let paths: Vec<&str> = report.errors().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["mode", "content", "theme.extend", "plugins[0]", "plugins[2]"]);

        assert!(!validate_document(&json!([])).is_valid());
    }

    #[test]
    fn test_check_plugins_reports_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = TailwindConfig::default();
        config.plugins = vec![PluginRef::new("./plugins/missing.js")];
        let report = check_plugins(&config, dir.path());
        assert_eq!(report.errors().count(), 1);
        assert!(report.issues[0].message.contains("./plugins/missing.js"));
    }
}

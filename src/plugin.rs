use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{ConfigError, Result};

/// Opaque reference to a Tailwind plugin module
///
/// The plugin itself is never loaded; only its module specifier and the
/// options it is invoked with are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PluginSpec", into = "PluginSpec")]
pub struct PluginRef {
    /// Module specifier as written in `require(...)`
    pub module: String,

    /// Options passed to the plugin factory, if it is called
    pub options: Option<Value>,
}

/// On-disk shape of a plugin entry: a bare module name or an object
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PluginSpec {
    Module(String),
    Detailed {
        module: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Value>,
    },
}

impl From<PluginSpec> for PluginRef {
    fn from(spec: PluginSpec) -> Self {
        match spec {
            PluginSpec::Module(module) => Self { module, options: None },
            PluginSpec::Detailed { module, options } => Self { module, options },
        }
    }
}

impl From<PluginRef> for PluginSpec {
    fn from(plugin: PluginRef) -> Self {
        match plugin.options {
            None => PluginSpec::Module(plugin.module),
            Some(options) => PluginSpec::Detailed {
                module: plugin.module,
                options: Some(options),
            },
        }
    }
}

const SCRIPT_EXTENSIONS: &[&str] = &["js", "cjs", "mjs"];

impl PluginRef {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Whether the specifier points at a file instead of a package
    pub fn is_relative(&self) -> bool {
        self.module.starts_with("./") || self.module.starts_with("../") || self.module.starts_with('/')
    }

    /// Package part of the specifier (`@scope/pkg/sub` -> `@scope/pkg`)
    pub fn package_name(&self) -> &str {
        let segments = if self.module.starts_with('@') { 2 } else { 1 };
        match self.module.match_indices('/').nth(segments - 1) {
            Some((idx, _)) => &self.module[..idx],
            None => &self.module,
        }
    }

    /// Locate the plugin the way Node's resolver would find it from `base_dir`
    pub fn resolve(&self, base_dir: &Path) -> Result<PathBuf> {
        if self.is_relative() {
            let target = base_dir.join(&self.module);
            let mut candidates = vec![target.clone()];
            // Appended, so `./plugins/hide.config` finds `hide.config.js`
            for ext in SCRIPT_EXTENSIONS {
                let mut name = target.clone().into_os_string();
                name.push(format!(".{}", ext));
                candidates.push(PathBuf::from(name));
            }
            candidates.push(target.join("index.js"));

            return candidates
                .into_iter()
                .find(|c| c.is_file())
                .ok_or_else(|| ConfigError::PluginNotFound(self.module.clone()));
        }

        for dir in base_dir.ancestors() {
            let manifest = dir
                .join("node_modules")
                .join(self.package_name())
                .join("package.json");
            debug!("Looking for plugin {} at {}", self.module, manifest.display());
            if manifest.is_file() {
                return Ok(manifest);
            }
        }

        Err(ConfigError::PluginNotFound(self.module.clone()))
    }
}

//! Rendering a configuration back into the formats it is authored in

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::config::TailwindConfig;
use crate::errors::Result;
use crate::plugin::PluginRef;

const TYPE_ANNOTATION: &str = "/** @type {import('tailwindcss').Config} */";
const INDENT: &str = "  ";
const MAX_INLINE_WIDTH: usize = 80;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap())
}

/// Render the configuration as a CommonJS module
pub fn to_js_module(config: &TailwindConfig) -> String {
    let mut out = String::new();
    out.push_str(TYPE_ANNOTATION);
    out.push('\n');
    out.push_str("module.exports = {\n");

    out.push_str(&format!("{}mode: {},\n", INDENT, js_string(config.mode.as_str())));

    let content: Vec<Value> = config.content.iter().cloned().map(Value::String).collect();
    out.push_str(&format!("{}content: {},\n", INDENT, render_array(&content, 1, "content: ".len())));

    let mut theme = serde_json::Map::new();
    theme.insert(
        "extend".to_string(),
        Value::Object(config.theme.extend.clone().into_iter().collect()),
    );
    for (key, value) in &config.theme.overrides {
        theme.insert(key.clone(), value.clone());
    }
    out.push_str(&format!("{}theme: {},\n", INDENT, render_value(&Value::Object(theme), 1)));

    if config.plugins.is_empty() {
        out.push_str(&format!("{}plugins: [],\n", INDENT));
    } else {
        out.push_str(&format!("{}plugins: [\n", INDENT));
        for plugin in &config.plugins {
            out.push_str(&format!("{}{},\n", INDENT.repeat(2), render_plugin(plugin)));
        }
        out.push_str(&format!("{}],\n", INDENT));
    }

    out.push_str("};\n");
    out
}

/// Render the configuration as JSON
pub fn to_json(config: &TailwindConfig, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(config)?
    } else {
        serde_json::to_string(config)?
    };
    Ok(json)
}

/// Render the configuration as YAML
pub fn to_yaml(config: &TailwindConfig) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

fn render_plugin(plugin: &PluginRef) -> String {
    let call = format!("require({})", js_single_quoted(&plugin.module));
    match &plugin.options {
        Some(options) => format!("{}({})", call, render_value(options, 2)),
        None => call,
    }
}

fn render_value(value: &Value, level: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => js_string(s),
        Value::Array(items) => render_array(items, level, 0),
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let mut out = String::from("{\n");
            for (key, value) in map {
                out.push_str(&INDENT.repeat(level + 1));
                out.push_str(&js_key(key));
                out.push_str(": ");
                out.push_str(&render_value(value, level + 1));
                out.push_str(",\n");
            }
            out.push_str(&INDENT.repeat(level));
            out.push('}');
            out
        }
    }
}

/// Arrays of scalars stay on one line when they fit
fn render_array(items: &[Value], level: usize, key_width: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }

    let scalar = items.iter().all(|v| !v.is_array() && !v.is_object());
    if scalar {
        let inline = format!(
            "[{}]",
            items.iter().map(|v| render_value(v, level)).collect::<Vec<_>>().join(", ")
        );
        // indentation + key + value + trailing comma
        if INDENT.len() * level + key_width + inline.len() + 1 <= MAX_INLINE_WIDTH {
            return inline;
        }
    }

    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&INDENT.repeat(level + 1));
        out.push_str(&render_value(item, level + 1));
        out.push_str(",\n");
    }
    out.push_str(&INDENT.repeat(level));
    out.push(']');
    out
}

fn js_key(key: &str) -> String {
    if identifier_re().is_match(key) {
        key.to_string()
    } else {
        js_string(key)
    }
}

/// JSON string syntax is valid JavaScript
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

fn js_single_quoted(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanMode;
    use crate::js_module::ModuleSyntax;

    #[test]
    fn test_default_config_as_commonjs() {
        let js = to_js_module(&TailwindConfig::default());
        let expected = r#"/** @type {import('tailwindcss').Config} */
module.exports = {
  mode: "all",
  content: ["./src/**/*.{rs,html,css}", "./dist/**/*.html"],
  theme: {
    extend: {},
  },
  plugins: [
    require('tailwind-scrollbar-hide'),
  ],
};
"#;
        assert_eq!(js, expected);
    }

    #[test]
    fn test_long_content_breaks_lines() {
        let mut config = TailwindConfig::default();
        config.content = vec![
            "./crates/frontend/src/**/*.{rs,html,css}".to_string(),
            "./crates/frontend/templates/**/*.html".to_string(),
        ];
        let js = to_js_module(&config);
        assert!(js.contains(
            "  content: [\n    \"./crates/frontend/src/**/*.{rs,html,css}\",\n    \"./crates/frontend/templates/**/*.html\",\n  ],\n"
        ));
    }

    #[test]
    fn test_theme_and_plugin_options_render() {
        let mut config = TailwindConfig::default();
        config.mode = ScanMode::Jit;
        config.theme.extend.insert(
            "colors".to_string(),
            serde_json::json!({ "primary": "#1a73e8", "accent-2": "#ff6b6b" }),
        );
        config.theme.overrides.insert("screens".to_string(), serde_json::json!({ "sm": "480px" }));
        config.plugins = vec![PluginRef::new("@tailwindcss/forms")
            .with_options(serde_json::json!({ "strategy": "class" }))];

        let js = to_js_module(&config);
        assert!(js.contains("  mode: \"jit\",\n"));
        assert!(js.contains("        \"accent-2\": \"#ff6b6b\",\n"));
        assert!(js.contains("    screens: {\n      sm: \"480px\",\n    },\n"));
        assert!(js.contains("    require('@tailwindcss/forms')({\n      strategy: \"class\",\n    }),\n"));
    }

    #[test]
    fn test_emitted_module_parses_back() {
        let mut config = TailwindConfig::default();
        config.theme.extend.insert("spacing".to_string(), serde_json::json!({ "128": "32rem" }));
        config.plugins.push(
            PluginRef::new("@tailwindcss/typography").with_options(serde_json::json!({ "className": "prose" })),
        );

        let js = to_js_module(&config);
        let parsed = TailwindConfig::from_js_str(&js, "emitted.js", ModuleSyntax::JavaScript).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_keeps_pattern_order() {
        let json = to_json(&TailwindConfig::default(), false).unwrap();
        assert!(json.starts_with(r#"{"mode":"all","content":["./src/**/*.{rs,html,css}","./dist/**/*.html"]"#));
    }

    #[test]
    fn test_single_quote_escaping() {
        assert_eq!(js_single_quoted("it's"), r"'it\'s'");
    }
}

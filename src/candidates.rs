use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::ast_visitor;
use crate::errors::{ConfigError, Result};
use crate::js_module::ModuleSyntax;

/// A token found in a content file that may be a utility class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// The token itself
    pub value: String,
    /// Source file path
    pub file_path: String,
    /// Line number in source file (1-indexed)
    pub line: usize,
    /// Column number in source file (0-indexed)
    pub column: usize,
}

impl Candidate {
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file_path, self.line, self.column)
    }
}

/// How a content file is tokenized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// JavaScript or TypeScript, read through the AST
    Script { syntax: ModuleSyntax, jsx: bool },
    /// HTML-like markup
    Markup,
    /// Stylesheets, where only `@apply` bodies hold classes
    Stylesheet,
    /// Anything else (Rust sources included): quoted string contents
    Text,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => SourceKind::Script {
                syntax: ModuleSyntax::JavaScript,
                jsx: true,
            },
            // `<T>expr` is a type assertion in .ts but an element in .tsx
            "ts" | "mts" | "cts" => SourceKind::Script {
                syntax: ModuleSyntax::TypeScript,
                jsx: false,
            },
            "tsx" => SourceKind::Script {
                syntax: ModuleSyntax::TypeScript,
                jsx: true,
            },
            "html" | "htm" | "vue" | "svelte" => SourceKind::Markup,
            "css" | "scss" | "pcss" | "postcss" => SourceKind::Stylesheet,
            _ => SourceKind::Text,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|s| s.to_str())
            .map(Self::from_extension)
            .unwrap_or(SourceKind::Text)
    }
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            // variants: hover:, md:, 2xl:, group-hover:, data-[state=open]:, [&>*]:
            r"^(?:[a-z0-9@_-]+(?:-\[[^\]\s]+\])?:|\[[^\]\s]+\]:)*",
            // important and negative prefixes
            r"!?-?",
            // utility with optional arbitrary value and modifier, or an arbitrary property
            r"(?:[a-z][a-z0-9]*(?:[-.][a-z0-9]+)*(?:-\[[^\]\s]+\])?(?:/(?:[0-9]+|\[[^\]\s]+\]))?",
            r"|\[[a-z-]+:[^\]\s]+\])",
            r"!?$",
        ))
        .unwrap()
    })
}

fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\\n]|\\.)*'|`(?:[^`\\]|\\.)*`"#).unwrap()
    })
}

fn apply_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@apply\s+([^;}]+)").unwrap())
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+").unwrap())
}

/// Whether a whitespace-free token has the shape of a utility class
pub fn is_class_candidate(token: &str) -> bool {
    token.len() <= 256 && class_re().is_match(token)
}

/// Whitespace-separated tokens of `body` with their byte offsets
pub(crate) fn tokens(body: &str) -> impl Iterator<Item = (usize, &str)> {
    token_re().find_iter(body).map(|m| (m.start(), m.as_str()))
}

/// Byte offsets of line starts, for offset -> line/column lookups
struct LineIndex<'a> {
    content: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(content: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { content, starts }
    }

    fn locate(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = self.content[self.starts[line]..offset].chars().count();
        (line + 1, column)
    }
}

/// Extract candidates from non-script text
pub fn extract_from_text(content: &str, kind: SourceKind, source_name: &str) -> Vec<Candidate> {
    let index = LineIndex::new(content);
    let mut candidates = Vec::new();

    let mut push_tokens = |start: usize, body: &str| {
        for (offset, token) in tokens(body) {
            if is_class_candidate(token) {
                let (line, column) = index.locate(start + offset);
                candidates.push(Candidate {
                    value: token.to_string(),
                    file_path: source_name.to_string(),
                    line,
                    column,
                });
            }
        }
    };

    match kind {
        SourceKind::Stylesheet => {
            for capture in apply_re().captures_iter(content) {
                if let Some(body) = capture.get(1) {
                    push_tokens(body.start(), body.as_str());
                }
            }
        }
        _ => {
            for literal in string_literal_re().find_iter(content) {
                let text = literal.as_str();
                if text.len() < 2 {
                    continue;
                }
                push_tokens(literal.start() + 1, &text[1..text.len() - 1]);
            }
        }
    }

    candidates
}

/// Extract candidates from in-memory content of the given kind
pub fn extract_from_content(content: &str, kind: SourceKind, source_name: &str) -> Result<Vec<Candidate>> {
    match kind {
        SourceKind::Script { syntax, jsx } => ast_visitor::extract_candidates(content, source_name, syntax, jsx),
        other => Ok(extract_from_text(content, other, source_name)),
    }
}

/// Read a content file and extract its candidates
///
/// `source_name` is the name recorded on every candidate.
pub fn extract_from_file(path: &Path, source_name: &str) -> Result<Vec<Candidate>> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: format!("Failed to read file: {}", e),
    })?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    extract_from_content(&content, SourceKind::from_path(path), source_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn test_class_shapes() {
        for class in [
            "flex",
            "bg-blue-500",
            "hover:bg-blue-600",
            "sm:inline",
            "space-x-3",
            "w-1.5",
            "-mt-4",
            "!font-bold",
            "grid-cols-[repeat(2,1fr)]",
            "bg-black/50",
            "text-[#1da1f2]",
            "[mask-type:luminance]",
            "md:hover:underline",
            "2xl:flex",
            "data-[state=open]:block",
            "scrollbar-hide",
        ] {
            assert!(is_class_candidate(class), "{} should be a candidate", class);
        }

        for token in ["Hello", "./src", "foo::bar", "a>(x:", "{}", "fn(x)", "#[derive"] {
            assert!(!is_class_candidate(token), "{} should not be a candidate", token);
        }
    }

    #[test]
    fn test_rust_component_source() {
        let source = r#"use dioxus::prelude::*;

#[component]
pub fn HeaderNavbar() -> Element {
    let inactive_class_str = "opacity-50 hover:opacity-100 hover:text-blue-900";
    rsx! {
        div {
            class: "w-full flex justify-center fixed top-0 left-0 bg-white border-b-2 z-10",
            span { class: "hidden sm:inline", "Tasks" }
        }
    }
}
"#;
        let candidates = extract_from_text(source, SourceKind::Text, "src/header_navbar.rs");
        let found = values(&candidates);
        for class in ["opacity-50", "hover:text-blue-900", "justify-center", "border-b-2", "z-10", "sm:inline"] {
            assert!(found.contains(&class), "missing {}", class);
        }
        assert!(!found.contains(&"Tasks"));

        let z10 = candidates.iter().find(|c| c.value == "z-10").unwrap();
        assert_eq!(z10.line, 8);
        assert_eq!(z10.file_path, "src/header_navbar.rs");
    }

    #[test]
    fn test_markup_attributes() {
        let html = "<body class=\"min-h-screen\">\n  <a href=\"/about\" class='text-sm underline'>About</a>\n</body>";
        let candidates = extract_from_text(html, SourceKind::Markup, "dist/index.html");
        assert_eq!(values(&candidates), vec!["min-h-screen", "text-sm", "underline"]);

        let text_sm = &candidates[1];
        assert_eq!((text_sm.line, text_sm.column), (2, 26));
    }

    #[test]
    fn test_stylesheet_apply() {
        let css = ".btn {\n  @apply px-4 py-2 rounded hover:bg-blue-600;\n}\n.x { content: \"not-a-class\"; }";
        let candidates = extract_from_text(css, SourceKind::Stylesheet, "src/style.css");
        assert_eq!(values(&candidates), vec!["px-4", "py-2", "rounded", "hover:bg-blue-600"]);
        assert_eq!(candidates[0].line, 2);
        assert_eq!(candidates[0].column, 9);
    }

    #[test]
    fn test_source_kind_from_path() {
        assert_eq!(SourceKind::from_path(Path::new("a/b.rs")), SourceKind::Text);
        assert_eq!(SourceKind::from_path(Path::new("index.HTML")), SourceKind::Markup);
        assert_eq!(
            SourceKind::from_path(Path::new("app.tsx")),
            SourceKind::Script {
                syntax: ModuleSyntax::TypeScript,
                jsx: true
            }
        );
        assert_eq!(
            SourceKind::from_path(Path::new("util.ts")),
            SourceKind::Script {
                syntax: ModuleSyntax::TypeScript,
                jsx: false
            }
        );
        assert_eq!(SourceKind::from_path(Path::new("style.css")), SourceKind::Stylesheet);
        assert_eq!(SourceKind::from_path(Path::new("Makefile")), SourceKind::Text);
    }
}

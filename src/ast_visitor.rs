use std::sync::Arc;
use swc_core::common::{BytePos, FileName, Globals, SourceMap, Span, GLOBALS};
use swc_core::ecma::ast::*;
use swc_core::ecma::parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::candidates::{is_class_candidate, tokens, Candidate};
use crate::errors::{ConfigError, Result};
use crate::js_module::ModuleSyntax;

/// Context for extracting candidates from a file
pub struct ExtractionContext {
    pub file_path: String,
    pub source_map: Arc<SourceMap>,
}

/// Visitor that collects class candidates from JavaScript/TypeScript string literals
pub struct ClassCandidateVisitor {
    /// Extracted candidates with their source locations
    pub candidates: Vec<Candidate>,
    /// Context for the current file being processed
    context: ExtractionContext,
}

impl ClassCandidateVisitor {
    pub fn new(context: ExtractionContext) -> Self {
        Self {
            candidates: Vec::new(),
            context,
        }
    }

    /// Split a string value and record the tokens shaped like classes
    ///
    /// `start` is where `value` begins in the source. Escapes can make the
    /// cooked value drift from the raw text; positions past `span` fall back
    /// to its start.
    fn extract_string(&mut self, value: &str, start: BytePos, span: Span) {
        for (offset, class_name) in tokens(value) {
            if !is_class_candidate(class_name) {
                continue;
            }

            let pos = start + BytePos(offset as u32);
            let pos = if pos < span.hi { pos } else { span.lo };
            let loc = self.context.source_map.lookup_char_pos(pos);

            self.candidates.push(Candidate {
                value: class_name.to_string(),
                file_path: self.context.file_path.clone(),
                line: loc.line,
                column: loc.col_display,
            });
        }
    }
}

impl Visit for ClassCandidateVisitor {
    /// Visit string literals
    fn visit_str(&mut self, node: &Str) {
        // Skip the opening quote
        let start = if node.span.hi > node.span.lo {
            node.span.lo + BytePos(1)
        } else {
            node.span.lo
        };
        self.extract_string(&node.value, start, node.span);
    }

    /// Visit template literals (backtick strings)
    fn visit_tpl(&mut self, node: &Tpl) {
        for quasi in &node.quasis {
            if let Some(cooked) = &quasi.cooked {
                self.extract_string(cooked, quasi.span.lo, quasi.span);
            } else {
                self.extract_string(&quasi.raw, quasi.span.lo, quasi.span);
            }
        }

        // Continue visiting expressions within the template
        node.visit_children_with(self);
    }

    /// Visit JSX text nodes
    fn visit_jsx_text(&mut self, node: &JSXText) {
        self.extract_string(&node.value, node.span.lo, node.span);
    }
}

fn parser_syntax(syntax: ModuleSyntax, jsx: bool) -> Syntax {
    match syntax {
        ModuleSyntax::JavaScript => Syntax::Es(EsSyntax {
            jsx,
            ..Default::default()
        }),
        ModuleSyntax::TypeScript => Syntax::Typescript(TsSyntax {
            tsx: jsx,
            ..Default::default()
        }),
    }
}

/// Parse JavaScript/TypeScript content and extract class candidates
///
/// `jsx` enables JSX elements (TSX for TypeScript).
pub fn extract_candidates(
    content: &str,
    source_name: &str,
    syntax: ModuleSyntax,
    jsx: bool,
) -> Result<Vec<Candidate>> {
    let source_map = Arc::new(SourceMap::default());
    let source_file = source_map.new_source_file(
        FileName::Custom(source_name.to_string()).into(),
        content.to_string(),
    );

    let module = GLOBALS.set(&Globals::new(), || {
        parse_file_as_module(
            &source_file,
            parser_syntax(syntax, jsx),
            EsVersion::latest(),
            None,
            &mut vec![],
        )
        .map_err(|e| ConfigError::ParseError {
            path: source_name.to_string(),
            message: format!("Failed to parse JavaScript/TypeScript: {:?}", e),
        })
    })?;

    let mut visitor = ClassCandidateVisitor::new(ExtractionContext {
        file_path: source_name.to_string(),
        source_map,
    });

    module.visit_with(&mut visitor);

    Ok(visitor.candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn test_jsx_attributes_and_text() {
        let source = r#"
export const Card = () => (
  <div className="shadow-lg rounded-lg p-6">
    <span className={`text-sm ${active ? "font-bold" : ""}`}>Hello world</span>
  </div>
);
"#;
        let candidates = extract_candidates(source, "card.jsx", ModuleSyntax::JavaScript, true).unwrap();
        let found = values(&candidates);
        for class in ["shadow-lg", "rounded-lg", "p-6", "text-sm", "font-bold", "world"] {
            assert!(found.contains(&class), "missing {}", class);
        }
        assert!(!found.contains(&"Hello"));

        let shadow = candidates.iter().find(|c| c.value == "shadow-lg").unwrap();
        assert_eq!((shadow.line, shadow.column), (3, 18));
        assert_eq!(shadow.file_path, "card.jsx");

        // Each token is located on its own, not at the start of the literal
        let rounded = candidates.iter().find(|c| c.value == "rounded-lg").unwrap();
        assert_eq!((rounded.line, rounded.column), (3, 28));
    }

    #[test]
    fn test_object_keys_and_typescript() {
        let source = r#"
const styles: Record<string, string> = {
  container: "flex flex-col gap-4",
  "hover:underline": "ignored-key-value",
};
"#;
        let candidates = extract_candidates(source, "styles.ts", ModuleSyntax::TypeScript, false).unwrap();
        let found = values(&candidates);
        assert!(found.contains(&"flex-col"));
        assert!(found.contains(&"hover:underline"));
        assert!(found.contains(&"ignored-key-value"));
    }

    #[test]
    fn test_plain_typescript_angle_brackets() {
        let source = r#"
const el = <HTMLElement>document.body;
const id = <T>(x: T) => x;
export const badge = id("inline-flex rounded-full px-2");
"#;
        let candidates = extract_candidates(source, "util.ts", ModuleSyntax::TypeScript, false).unwrap();
        assert_eq!(values(&candidates), vec!["inline-flex", "rounded-full", "px-2"]);
        assert_eq!(candidates[1].line, 4);
        assert_eq!(candidates[1].column, 37);
    }

    #[test]
    fn test_template_tokens_span_lines() {
        let source = "const cls = `grid\n  gap-4`;\n";
        let candidates = extract_candidates(source, "grid.js", ModuleSyntax::JavaScript, true).unwrap();
        let gap = candidates.iter().find(|c| c.value == "gap-4").unwrap();
        assert_eq!(gap.line, 2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = extract_candidates("export const = <div", "broken.jsx", ModuleSyntax::JavaScript, true).unwrap_err();
        assert!(err.to_string().contains("broken.jsx"));
    }
}

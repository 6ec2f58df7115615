//! Reading Tailwind configuration out of JavaScript/TypeScript modules
//!
//! The module is parsed with SWC and never executed. Only the statically
//! evaluable subset used by configuration files is understood:
//! - `module.exports = <expr>` and `export default <expr>`
//! - object, array, string, number, boolean and `null` literals
//! - template literals without interpolation
//! - identifiers bound by top-level `const`/`let`/`var` declarations
//! - `require('pkg')`, `require('pkg')(options)` and default imports in `plugins`
//!
//! Anything else is reported as an error with the line it appears on.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;
use swc_core::common::{FileName, Globals, SourceMap, Span, Spanned, GLOBALS};
use swc_core::ecma::ast::*;
use swc_core::ecma::parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax};

use crate::errors::{ConfigError, Result};

/// Maximum identifier indirections followed before giving up
const MAX_BINDING_DEPTH: usize = 32;

/// Dialect the configuration module is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSyntax {
    JavaScript,
    TypeScript,
}

impl ModuleSyntax {
    fn parser_syntax(self) -> Syntax {
        match self {
            ModuleSyntax::JavaScript => Syntax::Es(EsSyntax::default()),
            ModuleSyntax::TypeScript => Syntax::Typescript(TsSyntax::default()),
        }
    }
}

/// Parse a configuration module and return the exported object as a document
///
/// Plugin entries come back as `{"module": ..., "options": ...}` objects.
pub fn parse_config_module(source: &str, source_name: &str, syntax: ModuleSyntax) -> Result<Value> {
    let source_map = Arc::new(SourceMap::default());
    let source_file = source_map.new_source_file(
        FileName::Custom(source_name.to_string()).into(),
        source.to_string(),
    );

    let module = GLOBALS.set(&Globals::new(), || {
        parse_file_as_module(
            &source_file,
            syntax.parser_syntax(),
            EsVersion::latest(),
            None,
            &mut vec![],
        )
        .map_err(|e| ConfigError::ParseError {
            path: source_name.to_string(),
            message: format!("Failed to parse config module: {:?}", e),
        })
    })?;

    let reader = ModuleReader::new(&module, source_name, &source_map);
    reader.exported_config()
}

/// Static view over the top-level items of a configuration module
struct ModuleReader<'a> {
    source_name: &'a str,
    source_map: &'a SourceMap,
    /// Top-level variable bindings
    bindings: HashMap<String, &'a Expr>,
    /// Default imports, local name -> module specifier
    imports: HashMap<String, String>,
    /// The last exported expression
    export: Option<&'a Expr>,
}

impl<'a> ModuleReader<'a> {
    fn new(module: &'a Module, source_name: &'a str, source_map: &'a SourceMap) -> Self {
        let mut reader = Self {
            source_name,
            source_map,
            bindings: HashMap::new(),
            imports: HashMap::new(),
            export: None,
        };

        for item in &module.body {
            match item {
                ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => reader.record_var(var),
                ModuleItem::Stmt(Stmt::Expr(stmt)) => {
                    if let Expr::Assign(assign) = &*stmt.expr {
                        if assign.op == AssignOp::Assign && is_module_exports(&assign.left) {
                            reader.export = Some(&*assign.right);
                        }
                    }
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(export)) => {
                    reader.export = Some(&*export.expr);
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    if let Decl::Var(var) = &export.decl {
                        reader.record_var(var);
                    }
                }
                ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                    for specifier in &import.specifiers {
                        if let ImportSpecifier::Default(default) = specifier {
                            reader
                                .imports
                                .insert(default.local.sym.to_string(), import.src.value.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        reader
    }

    fn record_var(&mut self, var: &'a VarDecl) {
        for decl in &var.decls {
            if let (Pat::Ident(binding), Some(init)) = (&decl.name, &decl.init) {
                self.bindings.insert(binding.id.sym.to_string(), &**init);
            }
        }
    }

    fn exported_config(&self) -> Result<Value> {
        let export = self.export.ok_or_else(|| ConfigError::ParseError {
            path: self.source_name.to_string(),
            message: "module does not export a configuration (expected `module.exports = {...}` or `export default {...}`)".to_string(),
        })?;

        match self.resolve(export, "<export>")? {
            Expr::Object(object) => self.root_object(object),
            other => Err(self.unsupported(other, "<export>", "the exported value must be an object")),
        }
    }

    fn root_object(&self, object: &'a ObjectLit) -> Result<Value> {
        let mut root = Map::new();
        for (key, value) in self.object_entries(object, "")? {
            let converted = if key == "plugins" {
                self.plugins(value)?
            } else {
                self.literal(value, &key)?
            };
            root.insert(key, converted);
        }
        Ok(Value::Object(root))
    }

    fn plugins(&self, expr: &'a Expr) -> Result<Value> {
        match self.resolve(expr, "plugins")? {
            Expr::Array(array) => {
                let mut plugins = Vec::with_capacity(array.elems.len());
                for (idx, element) in array.elems.iter().enumerate() {
                    let path = format!("plugins[{}]", idx);
                    match element {
                        Some(ExprOrSpread { spread: None, expr }) => {
                            plugins.push(self.plugin(expr, &path)?);
                        }
                        Some(ExprOrSpread { expr, .. }) => {
                            return Err(self.unsupported(expr, &path, "spread elements are not supported"));
                        }
                        None => {
                            return Err(self.error_at(array.span, &path, "empty array slot"));
                        }
                    }
                }
                Ok(Value::Array(plugins))
            }
            other => Err(self.unsupported(other, "plugins", "plugins must be an array")),
        }
    }

    fn plugin(&self, expr: &'a Expr, path: &str) -> Result<Value> {
        let expr = self.resolve(expr, path)?;
        let (module, options) = match expr {
            Expr::Lit(Lit::Str(module)) => (module.value.to_string(), None),
            Expr::Ident(ident) if self.imports.contains_key(&*ident.sym) => {
                (self.imports[&*ident.sym].clone(), None)
            }
            Expr::Call(call) => match self.required_module(call) {
                Some(module) => (module, None),
                None => {
                    // Plugin factory invoked with options: require('pkg')({...})
                    let factory = match &call.callee {
                        Callee::Expr(callee) => self.resolve(callee, path)?,
                        _ => return Err(self.unsupported(expr, path, "expected a require() call")),
                    };
                    let module = match factory {
                        Expr::Call(inner) => self.required_module(inner),
                        Expr::Ident(ident) => self.imports.get(&*ident.sym).cloned(),
                        _ => None,
                    }
                    .ok_or_else(|| self.unsupported(expr, path, "expected a require() call"))?;

                    let options = match call.args.as_slice() {
                        [] => None,
                        [ExprOrSpread { spread: None, expr: arg }] => Some(self.literal(arg, path)?),
                        _ => return Err(self.unsupported(expr, path, "plugin options must be a single literal argument")),
                    };
                    (module, options)
                }
            },
            other => return Err(self.unsupported(other, path, "expected a require() call")),
        };

        let mut plugin = Map::new();
        plugin.insert("module".to_string(), Value::String(module));
        if let Some(options) = options {
            plugin.insert("options".to_string(), options);
        }
        Ok(Value::Object(plugin))
    }

    /// `require('pkg')` -> `pkg`
    fn required_module(&self, call: &CallExpr) -> Option<String> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        let Expr::Ident(ident) = &**callee else {
            return None;
        };
        if &*ident.sym != "require" {
            return None;
        }
        match call.args.as_slice() {
            [ExprOrSpread { spread: None, expr }] => match &**expr {
                Expr::Lit(Lit::Str(module)) => Some(module.value.to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    fn literal(&self, expr: &'a Expr, path: &str) -> Result<Value> {
        match self.resolve(expr, path)? {
            Expr::Lit(Lit::Str(s)) => Ok(Value::String(s.value.to_string())),
            Expr::Lit(Lit::Bool(b)) => Ok(Value::Bool(b.value)),
            Expr::Lit(Lit::Null(_)) => Ok(Value::Null),
            Expr::Lit(Lit::Num(n)) => Ok(number(n.value)),
            Expr::Unary(UnaryExpr { op: UnaryOp::Minus, arg, .. }) => match self.resolve(arg, path)? {
                Expr::Lit(Lit::Num(n)) => Ok(number(-n.value)),
                other => Err(self.unsupported(other, path, "only numbers can be negated")),
            },
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
                let mut text = String::new();
                for quasi in &tpl.quasis {
                    match &quasi.cooked {
                        Some(cooked) => text.push_str(cooked),
                        None => text.push_str(&quasi.raw),
                    }
                }
                Ok(Value::String(text))
            }
            Expr::Array(array) => {
                let mut items = Vec::with_capacity(array.elems.len());
                for (idx, element) in array.elems.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, idx);
                    match element {
                        Some(ExprOrSpread { spread: None, expr }) => items.push(self.literal(expr, &item_path)?),
                        Some(ExprOrSpread { expr, .. }) => {
                            return Err(self.unsupported(expr, &item_path, "spread elements are not supported"));
                        }
                        None => return Err(self.error_at(array.span, &item_path, "empty array slot")),
                    }
                }
                Ok(Value::Array(items))
            }
            Expr::Object(object) => {
                let mut map = Map::new();
                for (key, value) in self.object_entries(object, path)? {
                    let child_path = join_path(path, &key);
                    map.insert(key, self.literal(value, &child_path)?);
                }
                Ok(Value::Object(map))
            }
            other => Err(self.unsupported(other, path, "not a static value")),
        }
    }

    fn object_entries(&self, object: &'a ObjectLit, path: &str) -> Result<Vec<(String, &'a Expr)>> {
        let mut entries = Vec::with_capacity(object.props.len());
        for prop in &object.props {
            let PropOrSpread::Prop(prop) = prop else {
                return Err(self.error_at(object.span, path, "object spread is not supported"));
            };
            match &**prop {
                Prop::KeyValue(kv) => {
                    let key = self.prop_key(&kv.key, path)?;
                    entries.push((key, &*kv.value));
                }
                Prop::Shorthand(ident) => {
                    let key = ident.sym.to_string();
                    let value = self.bindings.get(&key).copied().ok_or_else(|| {
                        self.error_at(ident.span, path, &format!("`{}` is not a top-level constant", key))
                    })?;
                    entries.push((key, value));
                }
                other => {
                    return Err(self.error_at(other.span(), path, "methods and accessors are not supported"));
                }
            }
        }
        Ok(entries)
    }

    fn prop_key(&self, key: &PropName, path: &str) -> Result<String> {
        match key {
            PropName::Ident(ident) => Ok(ident.sym.to_string()),
            PropName::Str(s) => Ok(s.value.to_string()),
            PropName::Num(n) => match number(n.value) {
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(self.error_at(n.span, path, "invalid numeric key")),
            },
            other => Err(self.error_at(other.span(), path, "computed keys are not supported")),
        }
    }

    /// Strip parentheses and type assertions, follow identifiers to their bindings
    fn resolve(&self, mut expr: &'a Expr, path: &str) -> Result<&'a Expr> {
        for _ in 0..MAX_BINDING_DEPTH {
            expr = match expr {
                Expr::Paren(paren) => &paren.expr,
                Expr::TsAs(cast) => &cast.expr,
                Expr::TsSatisfies(satisfies) => &satisfies.expr,
                Expr::TsConstAssertion(assertion) => &assertion.expr,
                Expr::Ident(ident) => match self.bindings.get(&*ident.sym) {
                    Some(bound) => *bound,
                    None => return Ok(expr),
                },
                _ => return Ok(expr),
            };
        }
        Err(self.error_at(expr.span(), path, "binding chain is too deep"))
    }

    fn unsupported(&self, expr: &Expr, path: &str, reason: &str) -> ConfigError {
        self.error_at(expr.span(), path, &format!("{} (found {})", reason, describe(expr)))
    }

    fn error_at(&self, span: Span, path: &str, message: &str) -> ConfigError {
        let loc = self.source_map.lookup_char_pos(span.lo);
        let location = if path.is_empty() {
            format!("line {}", loc.line)
        } else {
            format!("line {}, key `{}`", loc.line, path)
        };
        ConfigError::ParseError {
            path: self.source_name.to_string(),
            message: format!("{}: {}", location, message),
        }
    }
}

fn is_module_exports(target: &AssignTarget) -> bool {
    let AssignTarget::Simple(SimpleAssignTarget::Member(member)) = target else {
        return false;
    };
    let is_module = matches!(&*member.obj, Expr::Ident(obj) if &*obj.sym == "module");
    let is_exports = matches!(&member.prop, MemberProp::Ident(prop) if &*prop.sym == "exports");
    is_module && is_exports
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Call(_) => "a function call",
        Expr::Fn(_) | Expr::Arrow(_) => "a function",
        Expr::Member(_) => "a member expression",
        Expr::Bin(_) => "a binary expression",
        Expr::Cond(_) => "a conditional expression",
        Expr::Tpl(_) => "a template literal with interpolation",
        Expr::Ident(_) => "an unbound identifier",
        Expr::Object(_) => "an object",
        Expr::Array(_) => "an array",
        Expr::Lit(_) => "a literal",
        _ => "an unsupported expression",
    }
}

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{ConfigError, Result};

/// Security configuration for reading content files
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum file size in bytes (default: 10MB)
    pub max_file_size: u64,
    /// Allow symbolic links
    pub allow_symlinks: bool,
    /// Symlink targets must stay inside this directory
    pub working_directory: PathBuf,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            allow_symlinks: false,
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl SecurityConfig {
    pub fn for_root(root: &Path) -> Self {
        Self {
            working_directory: root.to_path_buf(),
            ..Self::default()
        }
    }
}

/// A file selected by the content patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    pub path: PathBuf,
    pub size: u64,
}

/// A parsed `content` entry
///
/// A leading `!` turns the pattern into an exclusion. Brace groups such as
/// `*.{rs,html}` are expanded up front since the glob engine has no
/// alternation.
#[derive(Debug, Clone)]
pub struct ContentPattern {
    raw: String,
    negated: bool,
    expansions: Vec<String>,
}

impl ContentPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        if body.trim().is_empty() {
            return Err(ConfigError::InvalidPattern {
                pattern: raw.to_string(),
                message: "pattern is empty".to_string(),
            });
        }

        let expansions = expand_braces(body).map_err(|message| ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            message,
        })?;

        for expansion in &expansions {
            Pattern::new(expansion).map_err(|e| ConfigError::InvalidPattern {
                pattern: raw.to_string(),
                message: e.to_string(),
            })?;
        }

        Ok(Self {
            raw: raw.to_string(),
            negated,
            expansions,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Brace-free glob patterns this entry stands for
    pub fn expansions(&self) -> &[String] {
        &self.expansions
    }

    /// Expansions anchored at `base_dir`
    fn anchored(&self, base_dir: &Path) -> Vec<String> {
        self.expansions
            .iter()
            .map(|expansion| {
                if Path::new(expansion).is_absolute() {
                    expansion.clone()
                } else {
                    let relative = expansion.strip_prefix("./").unwrap_or(expansion);
                    format!("{}/{}", Pattern::escape(&base_dir.display().to_string()), relative)
                }
            })
            .collect()
    }

    /// Whether `path` (relative to `base_dir` or absolute) is selected by this pattern
    pub fn matches(&self, path: &Path, base_dir: &Path) -> bool {
        let path = if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) };
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        self.anchored(base_dir)
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .any(|pattern| pattern.matches_path_with(&path, options))
    }
}

/// Expand `{a,b}` groups, including nested and sequential ones
///
/// Groups without a top-level comma are kept literally.
pub fn expand_braces(pattern: &str) -> std::result::Result<Vec<String>, String> {
    let mut depth = 0usize;
    let mut open = None;

    for (idx, ch) in pattern.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    open = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(format!("unbalanced '}}' at offset {}", idx));
                }
                depth -= 1;
                if depth > 0 {
                    continue;
                }
                let Some(start) = open.take() else { continue };
                let alternatives = split_top_level(&pattern[start + 1..idx]);
                if alternatives.len() < 2 {
                    continue;
                }

                let prefix = &pattern[..start];
                let suffix = &pattern[idx + 1..];
                let mut expanded = Vec::new();
                for alternative in alternatives {
                    for item in expand_braces(&format!("{}{}{}", prefix, alternative, suffix))? {
                        if !expanded.contains(&item) {
                            expanded.push(item);
                        }
                    }
                }
                return Ok(expanded);
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err("unbalanced '{'".to_string());
    }
    Ok(vec![pattern.to_string()])
}

fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (idx, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[last..idx]);
                last = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[last..]);
    parts
}

/// Parse every content entry, failing on the first invalid one
pub fn parse_patterns(raw: &[String]) -> Result<Vec<ContentPattern>> {
    raw.iter().map(|p| ContentPattern::parse(p)).collect()
}

/// Check if a file is safe to read
pub fn validate_input_file(path: &Path, security: &SecurityConfig) -> Result<()> {
    // Check for symlinks if not allowed
    if !security.allow_symlinks && path.is_symlink() {
        return Err(ConfigError::SecurityError(format!(
            "Symbolic link not allowed: {}",
            path.display()
        )));
    }

    // If it's a symlink and we allow them, validate the target
    if security.allow_symlinks && path.is_symlink() {
        let target = path.canonicalize().map_err(|e| {
            ConfigError::SecurityError(format!(
                "Cannot read symlink target for '{}': {}",
                path.display(),
                e
            ))
        })?;
        let working_dir = security
            .working_directory
            .canonicalize()
            .unwrap_or_else(|_| security.working_directory.clone());

        if !target.starts_with(&working_dir) {
            return Err(ConfigError::SecurityError(format!(
                "Symlink target '{}' is outside working directory",
                target.display()
            )));
        }
    }

    let metadata = fs::metadata(path).map_err(|e| {
        ConfigError::SecurityError(format!(
            "Cannot read file metadata for '{}': {}",
            path.display(),
            e
        ))
    })?;

    if metadata.len() > security.max_file_size {
        return Err(ConfigError::SecurityError(format!(
            "File '{}' exceeds maximum size limit ({} MB > {} MB)",
            path.display(),
            metadata.len() / (1024 * 1024),
            security.max_file_size / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Collect the files selected by `patterns` under `base_dir`
///
/// Files are returned in the order their first matching pattern lists them.
/// Exclusion patterns remove files regardless of their position.
pub fn resolve_files(
    patterns: &[ContentPattern],
    base_dir: &Path,
    security: &SecurityConfig,
) -> Result<Vec<ContentFile>> {
    let exclusions: Vec<&ContentPattern> = patterns.iter().filter(|p| p.is_negated()).collect();
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    let mut skipped_count = 0;

    for pattern in patterns.iter().filter(|p| !p.is_negated()) {
        for anchored in pattern.anchored(base_dir) {
            debug!("Resolving content pattern {}", anchored);
            for entry in glob::glob(&anchored)? {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Skipping unreadable path - {}", e);
                        skipped_count += 1;
                        continue;
                    }
                };

                if path.is_dir() {
                    continue;
                }

                if exclusions.iter().any(|ex| ex.matches(&path, base_dir)) {
                    debug!("Excluded {}", path.display());
                    continue;
                }

                if let Err(e) = validate_input_file(&path, security) {
                    warn!("Skipping file - {}", e);
                    skipped_count += 1;
                    continue;
                }

                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

                if seen.insert(path.clone()) {
                    files.push(ContentFile { path, size });
                }
            }
        }
    }

    if skipped_count > 0 {
        warn!("Skipped {} paths that could not be read or failed security checks", skipped_count);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<div class=\"flex\"></div>").unwrap();
    }

    #[test]
    fn test_brace_expansion() {
        assert_eq!(
            expand_braces("./src/**/*.{rs,html,css}").unwrap(),
            vec!["./src/**/*.rs", "./src/**/*.html", "./src/**/*.css"]
        );
        assert_eq!(
            expand_braces("{a,b}/{x,y}").unwrap(),
            vec!["a/x", "a/y", "b/x", "b/y"]
        );
        assert_eq!(
            expand_braces("src/*.{js,{ts,tsx}}").unwrap(),
            vec!["src/*.js", "src/*.ts", "src/*.tsx"]
        );
        assert_eq!(expand_braces("./dist/**/*.html").unwrap(), vec!["./dist/**/*.html"]);
        assert_eq!(expand_braces("lit{eral}").unwrap(), vec!["lit{eral}"]);
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(expand_braces("src/*.{rs,html").is_err());
        assert!(expand_braces("src/*.rs}").is_err());
    }

    #[test]
    fn test_pattern_parsing() {
        let pattern = ContentPattern::parse("!./src/generated/**").unwrap();
        assert!(pattern.is_negated());
        assert_eq!(pattern.expansions(), &["./src/generated/**".to_string()]);

        assert!(ContentPattern::parse("").is_err());
        assert!(ContentPattern::parse("!").is_err());
        assert!(matches!(
            ContentPattern::parse("./src/[a-"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_pattern_matches() {
        let base = Path::new("/project");
        let pattern = ContentPattern::parse("./src/**/*.{rs,html}").unwrap();
        assert!(pattern.matches(Path::new("src/components/app.rs"), base));
        assert!(pattern.matches(Path::new("/project/src/index.html"), base));
        assert!(!pattern.matches(Path::new("src/style.css"), base));
        assert!(!pattern.matches(Path::new("dist/app.rs"), base));
    }

    #[test]
    fn test_resolve_files_in_pattern_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main.rs");
        touch(dir.path(), "src/components/navbar.rs");
        touch(dir.path(), "src/style.css");
        touch(dir.path(), "dist/index.html");
        touch(dir.path(), "dist/app.js");

        let patterns = parse_patterns(&[
            "./src/**/*.{rs,html,css}".to_string(),
            "./dist/**/*.html".to_string(),
        ])
        .unwrap();
        let files = resolve_files(&patterns, dir.path(), &SecurityConfig::for_root(dir.path())).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names.len(), 4);
        // Expansion order first, then pattern order
        assert_eq!(names[2], "src/style.css");
        assert_eq!(names[3], "dist/index.html");
        let mut sources = names[..2].to_vec();
        sources.sort();
        assert_eq!(sources, vec!["src/components/navbar.rs", "src/main.rs"]);
        assert!(files.iter().all(|f| f.size > 0));
    }

    #[test]
    fn test_resolve_files_with_exclusion_and_duplicates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main.rs");
        touch(dir.path(), "src/generated/bindings.rs");

        let patterns = parse_patterns(&[
            "./src/**/*.rs".to_string(),
            "./src/main.rs".to_string(),
            "!./src/generated/**".to_string(),
        ])
        .unwrap();
        let files = resolve_files(&patterns, dir.path(), &SecurityConfig::for_root(dir.path())).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("src/main.rs"));
    }

    #[test]
    fn test_oversized_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/small.rs");
        fs::write(dir.path().join("src/big.rs"), "a".repeat(2048)).unwrap();

        let security = SecurityConfig {
            max_file_size: 1024,
            ..SecurityConfig::for_root(dir.path())
        };
        let patterns = parse_patterns(&["./src/*.rs".to_string()]).unwrap();
        let files = resolve_files(&patterns, dir.path(), &security).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("small.rs"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_rejected_by_default() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/real.rs");
        std::os::unix::fs::symlink(dir.path().join("src/real.rs"), dir.path().join("src/link.rs")).unwrap();

        let patterns = parse_patterns(&["./src/*.rs".to_string()]).unwrap();
        let files = resolve_files(&patterns, dir.path(), &SecurityConfig::for_root(dir.path())).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("real.rs"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_abort_resolution() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/ok.html");
        touch(dir.path(), "src/locked/inner.html");
        let locked = dir.path().join("src/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let patterns = parse_patterns(&["./src/**/*.html".to_string()]).unwrap();
        let result = resolve_files(&patterns, dir.path(), &SecurityConfig::for_root(dir.path()));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let files = result.unwrap();
        assert!(files.iter().any(|f| f.path.ends_with("src/ok.html")));
    }
}

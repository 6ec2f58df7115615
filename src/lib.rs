pub mod args;
pub mod ast_visitor;
pub mod candidates;
pub mod config;
pub mod content;
pub mod emit;
pub mod errors;
pub mod js_module;
pub mod logging;
pub mod manifest;
pub mod plugin;
pub mod scanner;
pub mod validate;

pub use args::{CheckArgs, Cli, Commands, InitArgs, OutputFormat, PipeArgs, ScanArgs, ShowArgs};
pub use candidates::{extract_from_content, extract_from_file, Candidate, SourceKind};
pub use config::{ScanMode, TailwindConfig, Theme, CONFIG_FILE_NAMES};
pub use content::{ContentPattern, SecurityConfig};
pub use errors::{ConfigError, Result};
pub use js_module::ModuleSyntax;
pub use manifest::Manifest;
pub use plugin::PluginRef;
pub use scanner::{scan, ScanOptions, ScanOutcome};
pub use validate::{Issue, Severity, ValidationReport};

use indexmap::IndexSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Render a configuration in the requested format
pub fn render(config: &TailwindConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Js => Ok(emit::to_js_module(config)),
        OutputFormat::Json => Ok(format!("{}\n", emit::to_json(config, true)?)),
        OutputFormat::Yaml => emit::to_yaml(config),
    }
}

/// Write the default configuration; returns the path written
pub fn run_init(args: &InitArgs, cwd: &Path) -> Result<PathBuf> {
    let path = match &args.output {
        Some(output) if output.is_relative() => cwd.join(output),
        Some(output) => output.clone(),
        None => cwd.join(args.format.default_file_name()),
    };

    if path.exists() && !args.force {
        return Err(ConfigError::OutputError {
            path: path.display().to_string(),
            message: "file already exists (use --force to overwrite)".to_string(),
        });
    }

    let content = render(&TailwindConfig::default(), args.format)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_atomic(&path, &content).map_err(|e| ConfigError::OutputError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Load the configuration and render it in the requested format
pub fn run_show(args: &ShowArgs, cwd: &Path) -> Result<String> {
    let (_, config) = TailwindConfig::load(args.config.as_deref(), cwd)?;
    render(&config, args.format)
}

/// Validate the configuration; returns the file checked and every finding
///
/// Shape problems in the raw document are reported before the typed checks
/// run, so a document missing `theme.extend` is still an error even though
/// loading it would succeed.
pub fn run_check(args: &CheckArgs, cwd: &Path) -> Result<(PathBuf, ValidationReport)> {
    let path = match &args.config {
        Some(path) if path.is_relative() => cwd.join(path),
        Some(path) => path.clone(),
        None => TailwindConfig::discover(cwd)?,
    };

    let document = TailwindConfig::read_document(&path)?;
    let mut report = validate::validate_document(&document);

    if report.is_valid() {
        let config = TailwindConfig::from_value(document)?;
        report.extend(validate::validate(&config));

        if args.resolve_plugins {
            let base_dir = path.parent().unwrap_or(cwd);
            report.extend(validate::check_plugins(&config, base_dir));
        }
    }

    debug!(
        "{}: {} errors, {} warnings",
        path.display(),
        report.errors().count(),
        report.warnings().count()
    );
    Ok((path, report))
}

/// Scan the configured content and write the manifest
pub fn run_scan(args: &ScanArgs, cwd: &Path) -> Result<ScanOutcome> {
    args.validate().map_err(ConfigError::InvalidInput)?;

    let (config_path, config) = TailwindConfig::load(args.config.as_deref(), cwd)?;
    let report = validate::validate(&config);
    for issue in report.warnings() {
        warn!("{}", issue);
    }
    report.into_result()?;

    let base_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => cwd.to_path_buf(),
    };

    // Security: the manifest must stay inside the working directory
    validate_output_path(&args.manifest, cwd)?;
    let manifest_path = if args.manifest.is_relative() {
        cwd.join(&args.manifest)
    } else {
        args.manifest.clone()
    };

    // Writing the manifest over the configuration would destroy it
    if let (Ok(manifest), Ok(config)) = (manifest_path.canonicalize(), config_path.canonicalize()) {
        if manifest == config {
            return Err(ConfigError::InvalidInput(format!(
                "Manifest path '{}' is the configuration file",
                args.manifest.display()
            )));
        }
    }

    let previous = if config.mode.is_incremental() && manifest_path.is_file() {
        match Manifest::from_file(&manifest_path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Ignoring previous manifest: {}", e);
                None
            }
        }
    } else {
        None
    };

    let options = ScanOptions {
        security: SecurityConfig::for_root(&base_dir),
        base_dir,
        jobs: args.jobs,
        exclude: args.exclude.clone(),
        progress: !args.no_progress,
    };

    let outcome = scanner::scan(&config, &options, previous.as_ref())?;

    if args.dry_run {
        info!("Dry run; manifest not written");
    } else {
        outcome.manifest.write_to(&manifest_path, !args.compact)?;
        info!("Wrote {}", manifest_path.display());
    }

    Ok(outcome)
}

/// Validate that a relative path does not climb out of the working directory
fn validate_output_path(path: &Path, working_dir: &Path) -> Result<()> {
    if path.is_absolute() {
        return Ok(());
    }

    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if depth == 0 {
                    return Err(ConfigError::SecurityError(format!(
                        "Output path '{}' appears to use path traversal (outside {})",
                        path.display(),
                        working_dir.display()
                    )));
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }

    Ok(())
}

/// Write file atomically by writing to temp file then renaming
pub(crate) fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Unique class candidates in `input`, in order of first appearance
pub fn pipe_candidates(input: &str, extension: &str) -> Result<Vec<String>> {
    let kind = SourceKind::from_extension(extension.trim_start_matches('.'));
    let candidates = extract_from_content(input, kind, "stdin")?;
    let unique: IndexSet<String> = candidates.into_iter().map(|c| c.value).collect();
    Ok(unique.into_iter().collect())
}

/// Handle pipe command - read source from stdin, print one candidate per line
#[cfg(feature = "cli")]
pub async fn handle_pipe_command(args: PipeArgs) -> Result<()> {
    pipe(&args, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Read all of `reader`, write its unique candidates to `writer`
#[cfg(feature = "cli")]
pub async fn pipe<R, W>(args: &PipeArgs, mut reader: R, mut writer: W) -> Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .await
        .map_err(|e| ConfigError::InvalidInput(format!("Failed to read from stdin: {}", e)))?;

    if input.trim().is_empty() {
        return Ok(());
    }

    let classes = pipe_candidates(&input, &args.extension)?;
    if classes.is_empty() {
        return Ok(());
    }

    let mut output = classes.join("\n");
    output.push('\n');

    writer
        .write_all(output.as_bytes())
        .await
        .map_err(|e| ConfigError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;

    writer.flush().await.map_err(|e| ConfigError::OutputError {
        path: "stdout".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};
use tracing::{debug, info};

use crate::candidates::{extract_from_file, Candidate};
use crate::config::TailwindConfig;
use crate::content::{parse_patterns, resolve_files, ContentFile, ContentPattern, SecurityConfig};
use crate::errors::{ConfigError, Result};
use crate::manifest::Manifest;

/// Options controlling a content scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory the content patterns are relative to
    pub base_dir: PathBuf,
    /// Number of parallel threads (defaults to the number of CPU cores)
    pub jobs: Option<usize>,
    /// Additional exclusion patterns, without the leading `!`
    pub exclude: Vec<String>,
    pub security: SecurityConfig,
    /// Draw a progress bar on stderr
    pub progress: bool,
}

impl ScanOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            security: SecurityConfig::for_root(&base_dir),
            base_dir,
            jobs: None,
            exclude: Vec::new(),
            progress: false,
        }
    }
}

/// Result of a scan
#[derive(Debug)]
pub struct ScanOutcome {
    pub manifest: Manifest,
    /// Files read from disk during this scan
    pub files_scanned: usize,
    /// Files whose candidates were taken from the previous manifest
    pub files_reused: usize,
    /// Candidate occurrences across all files
    pub total_candidates: usize,
}

enum FileResult {
    Scanned(Vec<Candidate>),
    Reused(Vec<Candidate>),
}

struct Fingerprint {
    size: u64,
    modified_ns: Option<u64>,
}

fn fingerprint(file: &ContentFile) -> Fingerprint {
    let modified_ns = std::fs::metadata(&file.path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| u64::try_from(d.as_nanos()).ok());
    Fingerprint {
        size: file.size,
        modified_ns,
    }
}

/// Key a file is recorded under: its path relative to the base directory
fn file_key(path: &Path, base_dir: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Scan the configured content and build a manifest
///
/// In `jit` mode, files whose fingerprint matches `previous` are not read
/// again. In `all` mode `previous` is ignored.
pub fn scan(config: &TailwindConfig, options: &ScanOptions, previous: Option<&Manifest>) -> Result<ScanOutcome> {
    let start_time = Instant::now();

    let mut patterns = parse_patterns(&config.content)?;
    for exclude in &options.exclude {
        patterns.push(ContentPattern::parse(&format!("!{}", exclude))?);
    }

    let files = resolve_files(&patterns, &options.base_dir, &options.security)?;
    if files.is_empty() {
        return Err(ConfigError::NoFilesFound);
    }
    info!("Found {} content files", files.len());

    let previous = match previous {
        Some(manifest) if config.mode.is_incremental() => Some(manifest),
        Some(_) => {
            debug!("Mode is \"all\"; ignoring previous manifest");
            None
        }
        None => None,
    };

    let progress = Progress::new(options.progress, files.len());

    let work = || -> Result<Vec<(Fingerprint, FileResult)>> {
        files
            .par_iter()
            .map(|file| {
                let key = file_key(&file.path, &options.base_dir);
                let print = fingerprint(file);

                let reusable = previous
                    .and_then(|m| m.files.get(&key))
                    .filter(|recorded| recorded.is_fresh(print.size, print.modified_ns));

                let result = match reusable {
                    Some(recorded) => {
                        debug!("Unchanged: {}", key);
                        FileResult::Reused(recorded.to_candidates(&key))
                    }
                    None => {
                        debug!("Scanning: {}", key);
                        FileResult::Scanned(extract_from_file(&file.path, &key)?)
                    }
                };

                progress.tick(&key);
                Ok((print, result))
            })
            .collect()
    };

    let results = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| ConfigError::InvalidInput(format!("Failed to build thread pool: {}", e)))?
            .install(work)?,
        None => work()?,
    };

    let mut manifest = Manifest::new(config.mode, config.content.clone());
    let mut files_scanned = 0;
    let mut files_reused = 0;
    let mut total_candidates = 0;

    for (file, (print, result)) in files.iter().zip(results) {
        let candidates = match result {
            FileResult::Scanned(candidates) => {
                files_scanned += 1;
                candidates
            }
            FileResult::Reused(candidates) => {
                files_reused += 1;
                candidates
            }
        };
        total_candidates += candidates.len();
        manifest.add_file(
            file_key(&file.path, &options.base_dir),
            print.size,
            print.modified_ns,
            &candidates,
        );
    }

    manifest.calculate_statistics(files_reused, Some(start_time.elapsed().as_millis() as u64));
    progress.finish(files_scanned, files_reused);

    info!(
        "Scanned {} files ({} unchanged), {} unique classes from {} occurrences",
        files_scanned,
        files_reused,
        manifest.classes.len(),
        total_candidates
    );

    Ok(ScanOutcome {
        manifest,
        files_scanned,
        files_reused,
        total_candidates,
    })
}

#[cfg(feature = "cli")]
struct Progress(Option<indicatif::ProgressBar>);

#[cfg(feature = "cli")]
impl Progress {
    fn new(enabled: bool, len: usize) -> Self {
        use indicatif::{ProgressBar, ProgressStyle};

        if !enabled {
            return Self(None);
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        pb.set_message("Starting scan...");
        Self(Some(pb))
    }

    fn tick(&self, key: &str) {
        if let Some(pb) = &self.0 {
            pb.inc(1);
            pb.set_message(format!("Scanning: {}", key));
        }
    }

    fn finish(&self, scanned: usize, reused: usize) {
        if let Some(pb) = &self.0 {
            pb.finish_with_message(format!("✓ {} scanned, {} unchanged", scanned, reused));
        }
    }
}

#[cfg(not(feature = "cli"))]
struct Progress;

#[cfg(not(feature = "cli"))]
impl Progress {
    fn new(_enabled: bool, _len: usize) -> Self {
        Progress
    }

    fn tick(&self, _key: &str) {}

    fn finish(&self, _scanned: usize, _reused: usize) {}
}

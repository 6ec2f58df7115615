use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::candidates::Candidate;
use crate::config::ScanMode;
use crate::errors::{ConfigError, Result};
use crate::write_atomic;

/// Version of the manifest format
pub const MANIFEST_VERSION: &str = "1.1.0";

/// Metadata for the generated manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Version of the manifest format
    pub version: String,

    /// Timestamp when the manifest was generated
    pub generated_at: DateTime<Utc>,

    /// Scanning strategy used
    pub mode: ScanMode,

    /// Content patterns the files were selected with
    pub content: Vec<String>,

    /// Number of files processed
    pub files_processed: usize,

    /// Number of unique classes extracted
    pub classes_extracted: usize,

    /// Tool version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}

/// A candidate as recorded under its file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    pub value: String,
    pub line: usize,
    pub column: usize,
}

/// Fingerprint and candidates of one content file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Size in bytes
    pub size: u64,

    /// Modification time (nanoseconds since the Unix epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_ns: Option<u64>,

    /// Candidates found in the file, in source order
    pub candidates: Vec<FileCandidate>,
}

impl ManifestFile {
    /// Whether the file on disk still matches this fingerprint
    pub fn is_fresh(&self, size: u64, modified_ns: Option<u64>) -> bool {
        modified_ns.is_some() && self.size == size && self.modified_ns == modified_ns
    }

    /// Candidates re-attached to the file they came from
    pub fn to_candidates(&self, file_key: &str) -> Vec<Candidate> {
        self.candidates
            .iter()
            .map(|c| Candidate {
                value: c.value.clone(),
                file_path: file_key.to_string(),
                line: c.line,
                column: c.column,
            })
            .collect()
    }
}

/// Detailed class information in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestClassInfo {
    /// Number of occurrences of this class
    pub count: usize,

    /// Locations where this class was found (file:line:column)
    pub files: Vec<String>,
}

/// Complete manifest structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the scan
    pub metadata: ManifestMetadata,

    /// Content files keyed by their path relative to the project root
    pub files: IndexMap<String, ManifestFile>,

    /// Map of class names to their usage information
    pub classes: IndexMap<String, ManifestClassInfo>,

    /// Statistics about the scan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ManifestStatistics>,
}

/// Statistics about the scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStatistics {
    /// Number of files that matched patterns
    pub files_matched: usize,

    /// Number of files actually containing classes
    pub files_with_classes: usize,

    /// Number of files whose candidates came from the previous manifest
    pub files_reused: usize,

    /// Total candidate occurrences
    pub total_occurrences: usize,

    /// Processing time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,

    /// Top used classes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_classes: Option<Vec<TopClass>>,
}

/// Information about frequently used classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopClass {
    pub name: String,
    pub count: usize,
    pub file_count: usize,
}

impl Manifest {
    /// Create an empty manifest for a scan
    pub fn new(mode: ScanMode, content: Vec<String>) -> Self {
        Self {
            metadata: ManifestMetadata {
                version: MANIFEST_VERSION.to_string(),
                generated_at: Utc::now(),
                mode,
                content,
                files_processed: 0,
                classes_extracted: 0,
                tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            files: IndexMap::new(),
            classes: IndexMap::new(),
            statistics: None,
        }
    }

    /// Add or update class information
    pub fn add_class(&mut self, class_name: String, file_location: String) {
        let entry = self
            .classes
            .entry(class_name)
            .or_insert_with(|| ManifestClassInfo {
                count: 0,
                files: Vec::new(),
            });

        entry.count += 1;
        if !entry.files.contains(&file_location) {
            entry.files.push(file_location);
        }
    }

    /// Record a scanned file and register its candidates
    pub fn add_file(&mut self, key: String, size: u64, modified_ns: Option<u64>, candidates: &[Candidate]) {
        for candidate in candidates {
            self.add_class(candidate.value.clone(), candidate.location());
        }

        let recorded = candidates
            .iter()
            .map(|c| FileCandidate {
                value: c.value.clone(),
                line: c.line,
                column: c.column,
            })
            .collect();

        self.files.insert(
            key,
            ManifestFile {
                size,
                modified_ns,
                candidates: recorded,
            },
        );
        self.metadata.files_processed = self.files.len();
        self.metadata.classes_extracted = self.classes.len();
    }

    /// Unique class names in first-seen order
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Calculate and set statistics
    pub fn calculate_statistics(&mut self, files_reused: usize, processing_time_ms: Option<u64>) {
        let files_with_classes = self.files.values().filter(|f| !f.candidates.is_empty()).count();
        let total_occurrences = self.classes.values().map(|c| c.count).sum();

        // Find top classes
        let mut class_list: Vec<_> = self
            .classes
            .iter()
            .map(|(name, info)| TopClass {
                name: name.clone(),
                count: info.count,
                file_count: distinct_files(&info.files),
            })
            .collect();

        class_list.sort_by(|a, b| b.count.cmp(&a.count));
        let top_classes = class_list.into_iter().take(10).collect();

        self.statistics = Some(ManifestStatistics {
            files_matched: self.metadata.files_processed,
            files_with_classes,
            files_reused,
            total_occurrences,
            processing_time_ms,
            top_classes: Some(top_classes),
        });
    }

    /// Convert manifest to JSON value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Convert manifest to pretty JSON string
    pub fn to_pretty_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Convert manifest to compact JSON string
    pub fn to_compact_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Read a manifest written by a previous scan
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format!("Invalid manifest: {}", e),
        })
    }

    /// Write the manifest atomically
    pub fn write_to(&self, path: &Path, pretty: bool) -> Result<()> {
        let content = if pretty {
            self.to_pretty_json()?
        } else {
            self.to_compact_json()?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        write_atomic(path, &content).map_err(|e| ConfigError::OutputError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Count distinct files in a list of `file:line:column` locations
fn distinct_files(locations: &[String]) -> usize {
    let mut files: Vec<&str> = locations
        .iter()
        .map(|l| l.rsplitn(3, ':').nth(2).unwrap_or(l.as_str()))
        .collect();
    files.sort_unstable();
    files.dedup();
    files.len()
}

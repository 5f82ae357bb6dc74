//! Batch Driver: applies a list of update requests, one entry at a time

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::request::UpdateRequest;
use super::writer::{MetadataWriter, UpdateOutcome};
use super::{MetadataError, Result};
use crate::config::DashConfig;
use crate::lock::{PathLocks, normalize};

/// An entry that was not applied
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    /// Position of the entry in the batch
    pub index: usize,
    pub path: Option<String>,
    pub reason: String,
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: Vec<SkippedEntry>,
    /// Files that were rewritten, in application order
    pub touched: Vec<PathBuf>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.applied + self.unchanged + self.skipped.len()
    }

    /// True when no entry was skipped
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} unchanged, {} skipped",
            self.applied,
            self.unchanged,
            self.skipped.len()
        )
    }
}

/// Runs update requests through the [`MetadataWriter`]
pub struct BatchDriver {
    writer: MetadataWriter,
    base_dir: PathBuf,
    locks: PathLocks,
}

impl BatchDriver {
    /// Request paths are resolved against the current directory
    pub fn new(config: DashConfig) -> Self {
        Self::with_base_dir(config, PathBuf::from("."))
    }

    /// Request paths are resolved against `base_dir`
    pub fn with_base_dir(config: DashConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self { writer: MetadataWriter::new(config), base_dir: base_dir.into(), locks: PathLocks::new() }
    }

    pub fn writer(&self) -> &MetadataWriter {
        &self.writer
    }

    pub fn resolve(&self, target: &str) -> PathBuf {
        self.base_dir.join(target)
    }

    /// Resolve the target of entry `index`. Only files with a scanned
    /// extension inside the scan root are accepted.
    pub fn checked_target(&self, index: usize, request: &UpdateRequest) -> Result<PathBuf> {
        let malformed = |reason: String| MetadataError::MalformedPatch { index, reason };

        if let Some(reason) = &request.invalid {
            return Err(malformed(reason.clone()));
        }
        let target = request.target().ok_or_else(|| malformed("missing path".to_string()))?;

        let path = self.resolve(target);
        let config = self.writer.config();
        let root = normalize(&self.base_dir.join(&config.root));
        if !normalize(&path).starts_with(&root) {
            return Err(malformed(format!("{} is outside {}", target, root.display())));
        }
        if !config.matches_extension(&path) {
            return Err(malformed(format!("{} is not a scanned file type", target)));
        }

        Ok(path)
    }

    /// Apply every request in order. A failing entry is recorded and the batch
    /// moves on; later requests for the same path win.
    pub fn apply_batch(&self, requests: &[UpdateRequest]) -> BatchReport {
        let mut report = BatchReport::default();
        let schema = &self.writer.config().schema;

        for (index, request) in requests.iter().enumerate() {
            let skip = |error: MetadataError| SkippedEntry {
                index,
                path: request.path.clone(),
                reason: error.to_string(),
            };

            let path = match self.checked_target(index, request) {
                Ok(path) => path,
                Err(error) => {
                    warn!("Skipping update: {}", error);
                    report.skipped.push(skip(error));
                    continue;
                }
            };

            let patch = request.patch(schema);
            let outcome = self.locks.with_lock(&path, || self.writer.apply_update(&path, &patch));

            match outcome {
                UpdateOutcome::Applied { .. } => {
                    report.applied += 1;
                    report.touched.push(path);
                }
                UpdateOutcome::Unchanged => report.unchanged += 1,
                UpdateOutcome::Skipped(error) => report.skipped.push(skip(error)),
            }
        }

        info!("Batch finished: {}", report.summary());
        report
    }

    /// Apply a request file. When `remove_after` is set the file is deleted
    /// once every entry has been attempted.
    pub fn apply_request_file(&self, path: &Path, remove_after: bool) -> Result<BatchReport> {
        let requests = UpdateRequest::load_file(path)?;
        let report = self.apply_batch(&requests);

        if remove_after {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Could not remove request file {:?}: {}", path, e);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn driver(dir: &TempDir) -> BatchDriver {
        BatchDriver::with_base_dir(DashConfig::with_root(dir.path()), dir.path())
    }

    #[test]
    fn test_batch_with_one_bad_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "// Problem: A\nclass A {}\n").unwrap();
        fs::write(dir.path().join("B.java"), "// Problem: B\nclass B {}\n").unwrap();

        let requests = vec![
            UpdateRequest::new("A.java").with_field("level", "Easy"),
            UpdateRequest::default().with_field("level", "Hard"),
            UpdateRequest::new("B.java").with_field("notes", "stack"),
        ];

        let report = driver(&dir).apply_batch(&requests);
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert!(report.skipped[0].reason.contains("Malformed patch"));
        assert!(!report.is_success());

        assert_eq!(
            fs::read_to_string(dir.path().join("A.java")).unwrap(),
            "// Problem: A\n// Level: Easy\nclass A {}\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("B.java")).unwrap(),
            "// Problem: B\n// Notes: stack\nclass B {}\n"
        );
    }

    #[test]
    fn test_missing_file_does_not_abort() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "class A {}\n").unwrap();

        let requests = vec![
            UpdateRequest::new("gone/Missing.java").with_field("level", "Easy"),
            UpdateRequest::new("A.java").with_field("level", "Easy"),
        ];

        let report = driver(&dir).apply_batch(&requests);
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped[0].path.as_deref(), Some("gone/Missing.java"));
        assert!(!dir.path().join("gone").exists());
    }

    #[test]
    fn test_last_write_wins_for_same_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "// Problem: A\n// Level: Easy\n").unwrap();

        let requests = vec![
            UpdateRequest::new("A.java").with_field("level", "Medium"),
            UpdateRequest::new("A.java").with_field("level", "Hard"),
        ];

        let report = driver(&dir).apply_batch(&requests);
        assert_eq!(report.applied, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("A.java")).unwrap(),
            "// Problem: A\n// Level: Hard\n"
        );
    }

    #[test]
    fn test_blank_fields_never_clear() {
        let dir = TempDir::new().unwrap();
        let content = "// Problem: A\n// Level: Easy\n// Notes: keep me\n";
        fs::write(dir.path().join("A.java"), content).unwrap();

        let requests =
            vec![UpdateRequest::new("A.java").with_field("level", "").with_field("notes", "  ")];

        let report = driver(&dir).apply_batch(&requests);
        assert_eq!(report.unchanged, 1);
        assert!(report.is_success());
        assert_eq!(fs::read_to_string(dir.path().join("A.java")).unwrap(), content);
    }

    #[test]
    fn test_request_file_removed_after_batch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "// Problem: A\n").unwrap();
        let request_file = dir.path().join("updates.json");
        fs::write(
            &request_file,
            r#"[{"path": "A.java", "revisit": "Yes"}, {"revisit": "No"}, {"path": "Nope.java", "revisit": "No"}]"#,
        )
        .unwrap();

        let report = driver(&dir).apply_request_file(&request_file, true).unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(!request_file.exists());
    }

    #[test]
    fn test_request_file_kept_when_asked() {
        let dir = TempDir::new().unwrap();
        let request_file = dir.path().join("updates.json");
        fs::write(&request_file, "[]").unwrap();

        let report = driver(&dir).apply_request_file(&request_file, false).unwrap();
        assert_eq!(report.total(), 0);
        assert!(request_file.exists());
    }

    #[test]
    fn test_unparseable_request_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let request_file = dir.path().join("updates.json");
        fs::write(&request_file, "{").unwrap();

        assert!(driver(&dir).apply_request_file(&request_file, true).is_err());
        assert!(request_file.exists());
    }

    #[test]
    fn test_targets_outside_root_are_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("dsa");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("A.java"), "class A {}\n").unwrap();
        let secrets = "token = abc\n";
        fs::write(dir.path().join("secrets.cfg"), secrets).unwrap();
        fs::write(dir.path().join("Outside.java"), "class O {}\n").unwrap();

        let driver = BatchDriver::with_base_dir(DashConfig::with_root(&root), &root);
        let outside = dir.path().join("Outside.java");
        let requests = vec![
            UpdateRequest::new("../secrets.cfg").with_field("notes", "leaked"),
            UpdateRequest::new(outside.to_string_lossy()).with_field("notes", "leaked"),
            UpdateRequest::new("sub/../../Outside.java").with_field("notes", "leaked"),
            UpdateRequest::new("A.java").with_field("notes", "ok"),
        ];

        let report = driver.apply_batch(&requests);
        assert_eq!(report.applied, 1);
        let indices: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(report.skipped[0].reason.contains("outside"));

        assert_eq!(fs::read_to_string(dir.path().join("secrets.cfg")).unwrap(), secrets);
        assert_eq!(fs::read_to_string(&outside).unwrap(), "class O {}\n");
        assert_eq!(fs::read_to_string(root.join("A.java")).unwrap(), "// Notes: ok\nclass A {}\n");
    }

    #[test]
    fn test_unscanned_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "todo\n").unwrap();

        let requests = vec![UpdateRequest::new("notes.txt").with_field("level", "Easy")];
        let report = driver(&dir).apply_batch(&requests);

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("not a scanned file type"));
        assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "todo\n");
    }

    #[test]
    fn test_malformed_entries_are_skipped_in_place() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "// Problem: A\n").unwrap();
        fs::write(dir.path().join("B.java"), "// Problem: B\n").unwrap();

        let requests = UpdateRequest::parse_list(
            r#"[{"path": "A.java", "level": "Easy"}, {"path": 5, "level": "Hard"}, null, "B.java", {"path": "B.java", "level": "Medium"}]"#,
        )
        .unwrap();

        let report = driver(&dir).apply_batch(&requests);
        assert_eq!(report.applied, 2);
        let indices: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(report.skipped.iter().all(|s| s.reason.contains("Malformed patch")));

        assert_eq!(fs::read_to_string(dir.path().join("A.java")).unwrap(), "// Problem: A\n// Level: Easy\n");
        assert_eq!(fs::read_to_string(dir.path().join("B.java")).unwrap(), "// Problem: B\n// Level: Medium\n");
    }
}

//! Metadata Writer: rewrites field comments in place
//!
//! The line editing is a pure pass over the file's lines ([`LineEditor`]); the
//! [`MetadataWriter`] wraps it with file I/O and an atomic replace.

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{MetadataError, Result};
use crate::config::DashConfig;
use crate::schema::FieldSchema;

/// Where the scan is relative to the anchor (`Problem:`) line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// No anchor seen yet
    BeforeAnchor,
    /// On the anchor or in the run of field comments directly after it
    AnchorBlock { anchor: usize },
    /// Past the anchor block
    AfterAnchor { anchor: usize },
}

impl ScanState {
    fn anchor(self) -> Option<usize> {
        match self {
            ScanState::BeforeAnchor => None,
            ScanState::AnchorBlock { anchor } | ScanState::AfterAnchor { anchor } => Some(anchor),
        }
    }
}

/// Result of editing a line sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Lines including their terminators
    pub lines: Vec<String>,
    /// Existing comment lines whose value changed
    pub replaced: usize,
    /// Newly inserted field lines (the blank separator is not counted)
    pub inserted: usize,
}

impl Edit {
    pub fn is_changed(&self) -> bool {
        self.replaced > 0 || self.inserted > 0
    }

    pub fn into_content(self) -> String {
        self.lines.concat()
    }
}

/// Pure line editor applying a patch to metadata comments
pub struct LineEditor<'a> {
    schema: &'a FieldSchema,
    anchor: &'a str,
    window: usize,
}

/// Split content into lines that keep their terminators
pub fn split_lines(content: &str) -> Vec<String> {
    content.split_inclusive('\n').map(str::to_string).collect()
}

fn terminator(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

impl<'a> LineEditor<'a> {
    pub fn new(schema: &'a FieldSchema, anchor: &'a str, window: usize) -> Self {
        Self { schema, anchor, window }
    }

    pub fn from_config(config: &'a DashConfig) -> Self {
        Self::new(&config.schema, &config.anchor_field, config.field_window)
    }

    /// Recognised field name of a line, if it is a metadata comment
    fn field_of<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str)> {
        regex_utils::comment::split_field(line.trim())
            .filter(|(name, _)| self.schema.get(name).is_some())
    }

    /// Apply `patch` (canonical field name -> non-empty value) to `lines`.
    ///
    /// Existing comment lines inside the field window are rewritten in place.
    /// The run of field comments directly after the anchor is followed past the
    /// window so that previously inserted lines are always found again.
    /// Missing fields are inserted after the anchor line, or prepended with a
    /// blank separator when there is no anchor.
    pub fn apply(&self, mut lines: Vec<String>, patch: &[(String, String)]) -> Edit {
        let newline = lines.first().map(|l| terminator(l)).filter(|t| !t.is_empty()).unwrap_or("\n");
        let mut found = vec![false; patch.len()];
        let mut replaced = 0;
        let mut state = ScanState::BeforeAnchor;
        // Every line so far is a field comment, e.g. a block prepended earlier
        let mut leading_block = true;

        for idx in 0..lines.len() {
            let field = self.field_of(&lines[idx]).map(|(name, _)| name.to_string());
            leading_block = leading_block && field.is_some();

            if idx >= self.window {
                let in_block = matches!(state, ScanState::AnchorBlock { .. }) || leading_block;
                if !(in_block && field.is_some()) {
                    break;
                }
            }

            state = match (state, field.as_deref()) {
                (ScanState::BeforeAnchor, Some(name)) if name == self.anchor => {
                    ScanState::AnchorBlock { anchor: idx }
                }
                (ScanState::AnchorBlock { anchor }, None) => ScanState::AfterAnchor { anchor },
                (current, _) => current,
            };

            let Some(name) = field else { continue };
            let Some(slot) = patch.iter().position(|(field, _)| *field == name) else { continue };
            found[slot] = true;

            let line = &lines[idx];
            let indent = &line[..line.len() - line.trim_start().len()];
            let rewritten = format!(
                "{}{}{}",
                indent,
                regex_utils::comment::format_field(&name, &patch[slot].1),
                terminator(line)
            );
            if rewritten != *line {
                lines[idx] = rewritten;
                replaced += 1;
            }
        }

        let insertion: Vec<String> = patch
            .iter()
            .zip(&found)
            .filter(|(_, found)| !**found)
            .map(|((name, value), _)| {
                format!("{}{}", regex_utils::comment::format_field(name, value), newline)
            })
            .collect();
        let inserted = insertion.len();

        if !insertion.is_empty() {
            match state.anchor() {
                Some(anchor) => {
                    if terminator(&lines[anchor]).is_empty() {
                        lines[anchor].push_str(newline);
                    }
                    lines.splice(anchor + 1..anchor + 1, insertion);
                }
                None => {
                    let mut block = insertion;
                    block.push(newline.to_string());
                    lines.splice(0..0, block);
                }
            }
        }

        Edit { lines, replaced, inserted }
    }
}

/// Outcome of applying one patch to one file
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The file was rewritten
    Applied { replaced: usize, inserted: usize },
    /// The patch matched the current content; nothing was written
    Unchanged,
    /// The update was not attempted or failed; the file is untouched
    Skipped(MetadataError),
}

impl UpdateOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, UpdateOutcome::Skipped(_))
    }
}

/// Applies patches to metadata comments on disk
pub struct MetadataWriter {
    config: DashConfig,
}

impl MetadataWriter {
    pub fn new(config: DashConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    /// Apply `patch` to `path`. Failures are logged and reported as
    /// [`UpdateOutcome::Skipped`]; a missing file is never created.
    pub fn apply_update(&self, path: &Path, patch: &[(String, String)]) -> UpdateOutcome {
        match self.try_apply(path, patch) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Skipping update: {}", e);
                UpdateOutcome::Skipped(e)
            }
        }
    }

    fn try_apply(&self, path: &Path, patch: &[(String, String)]) -> Result<UpdateOutcome> {
        if !path.is_file() {
            return Err(MetadataError::unwritable(path, "file does not exist"));
        }

        let content = fs::read_to_string(path).map_err(|e| MetadataError::unwritable(path, e))?;
        let edit = LineEditor::from_config(&self.config).apply(split_lines(&content), patch);

        if !edit.is_changed() {
            debug!("No metadata changes for {:?}", path);
            return Ok(UpdateOutcome::Unchanged);
        }

        let (replaced, inserted) = (edit.replaced, edit.inserted);
        write_atomic(path, edit.into_content().as_bytes())?;

        info!("Updated {:?} ({} replaced, {} inserted)", path, replaced, inserted);
        Ok(UpdateOutcome::Applied { replaced, inserted })
    }
}

/// Write to a temp file next to `path`, then rename over it
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).map_err(|e| MetadataError::unwritable(path, e))?.permissions();

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| MetadataError::unwritable(path, e))?;
    tmp.write_all(content).map_err(|e| MetadataError::unwritable(path, e))?;
    tmp.as_file().sync_all().map_err(|e| MetadataError::unwritable(path, e))?;
    tmp.as_file().set_permissions(permissions).map_err(|e| MetadataError::unwritable(path, e))?;
    tmp.persist(path).map_err(|e| MetadataError::unwritable(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patch(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn edit(content: &str, pairs: &[(&str, &str)]) -> Edit {
        let schema = FieldSchema::default();
        LineEditor::new(&schema, "Problem", 50).apply(split_lines(content), &patch(pairs))
    }

    #[test]
    fn test_replace_in_place_keeps_line_count() {
        let content = "// Problem: Two Sum\n// Level: Easy\n// Notes: map\nclass A {}\n";
        let result = edit(content, &[("Level", "Medium")]);

        assert_eq!(result.replaced, 1);
        assert_eq!(result.inserted, 0);
        assert_eq!(result.lines.len(), 4);
        assert_eq!(
            result.into_content(),
            "// Problem: Two Sum\n// Level: Medium\n// Notes: map\nclass A {}\n"
        );
    }

    #[test]
    fn test_insert_directly_after_anchor() {
        let content = "// Problem: Two Sum\nclass A {\n}\n";
        let result = edit(content, &[("Level", "Medium")]);

        assert_eq!(result.inserted, 1);
        assert_eq!(result.into_content(), "// Problem: Two Sum\n// Level: Medium\nclass A {\n}\n");
    }

    #[test]
    fn test_insert_block_in_patch_order() {
        let content = "package x;\n// Problem: P\n// Level: Easy\nclass A {}\n";
        let result = edit(content, &[("Level", "Hard"), ("Revisit", "Yes"), ("Notes", "dp")]);

        assert_eq!(result.replaced, 1);
        assert_eq!(result.inserted, 2);
        assert_eq!(
            result.into_content(),
            "package x;\n// Problem: P\n// Revisit: Yes\n// Notes: dp\n// Level: Hard\nclass A {}\n"
        );
    }

    #[test]
    fn test_prepend_without_anchor() {
        let content = "class A {}\n";
        let result = edit(content, &[("Level", "Easy"), ("Notes", "n")]);

        assert_eq!(result.inserted, 2);
        assert_eq!(result.lines.len(), 1 + 2 + 1);
        assert_eq!(result.into_content(), "// Level: Easy\n// Notes: n\n\nclass A {}\n");
    }

    #[test]
    fn test_prepend_into_empty_file() {
        let result = edit("", &[("Problem", "New")]);
        assert_eq!(result.into_content(), "// Problem: New\n\n");
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let content = "// Problem: P\n// Level: Easy\n";
        let result = edit(content, &[]);
        assert!(!result.is_changed());
        assert_eq!(result.into_content(), content);
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let content = "// Problem: P\n// Level: Easy\n";
        let result = edit(content, &[("Level", "Easy")]);
        assert!(!result.is_changed());
    }

    #[test]
    fn test_idempotent() {
        let content = "// Problem: Two Sum\nclass A {}\n";
        let pairs = [("Level", "Medium"), ("Notes", "hash map")];

        let once = edit(content, &pairs).into_content();
        let twice = edit(&once, &pairs);
        assert!(!twice.is_changed());
        assert_eq!(twice.into_content(), once);
    }

    #[test]
    fn test_idempotent_when_anchor_at_window_edge() {
        let schema = FieldSchema::default();
        let editor = LineEditor::new(&schema, "Problem", 2);
        let content = "package x;\n// Problem: P\nclass A {}\n";
        let pairs = patch(&[("Level", "Easy"), ("Notes", "n")]);

        let once = editor.apply(split_lines(content), &pairs).into_content();
        assert_eq!(once, "package x;\n// Problem: P\n// Level: Easy\n// Notes: n\nclass A {}\n");

        let twice = editor.apply(split_lines(&once), &pairs);
        assert!(!twice.is_changed());
    }

    #[test]
    fn test_idempotent_when_prepended_block_exceeds_window() {
        let schema = FieldSchema::default();
        let editor = LineEditor::new(&schema, "Problem", 1);
        let pairs = patch(&[("Level", "Easy"), ("Revisit", "Yes"), ("Notes", "n")]);

        let once = editor.apply(split_lines("class A {}\n"), &pairs).into_content();
        assert_eq!(once, "// Level: Easy\n// Revisit: Yes\n// Notes: n\n\nclass A {}\n");

        let twice = editor.apply(split_lines(&once), &pairs);
        assert!(!twice.is_changed());
        assert_eq!(twice.into_content(), once);

        let changed = editor.apply(split_lines(&once), &patch(&[("Notes", "m")]));
        assert_eq!(changed.replaced, 1);
        assert_eq!(changed.inserted, 0);
    }

    #[test]
    fn test_lines_beyond_window_are_not_touched() {
        let schema = FieldSchema::default();
        let editor = LineEditor::new(&schema, "Problem", 2);
        let content = "class A {\n}\n// Level: Easy\n";
        let result = editor.apply(split_lines(content), &patch(&[("Level", "Hard")]));

        assert_eq!(result.replaced, 0);
        assert_eq!(result.inserted, 1);
        assert_eq!(result.into_content(), "// Level: Hard\n\nclass A {\n}\n// Level: Easy\n");
    }

    #[test]
    fn test_duplicate_lines_are_all_rewritten() {
        let content = "// Problem: P\n// Level: Easy\n// Level: Easy\n";
        let result = edit(content, &[("Level", "Hard")]);
        assert_eq!(result.replaced, 2);
        assert_eq!(result.inserted, 0);
        assert_eq!(result.into_content(), "// Problem: P\n// Level: Hard\n// Level: Hard\n");
    }

    #[test]
    fn test_crlf_and_indent_preserved() {
        let content = "  // Problem: P\r\n  // Level: Easy\r\nclass A {}\r\n";
        let result = edit(content, &[("Level", "Hard"), ("Notes", "n")]);
        assert_eq!(
            result.into_content(),
            "  // Problem: P\r\n// Notes: n\r\n  // Level: Hard\r\nclass A {}\r\n"
        );
    }

    #[test]
    fn test_unterminated_anchor_gets_newline() {
        let result = edit("// Problem: P", &[("Level", "Easy")]);
        assert_eq!(result.into_content(), "// Problem: P\n// Level: Easy\n");
    }

    #[test]
    fn test_unterminated_last_line_kept_unterminated() {
        let result = edit("// Problem: P\n// Level: Easy", &[("Level", "Hard")]);
        assert_eq!(result.into_content(), "// Problem: P\n// Level: Hard");
    }

    #[test]
    fn test_other_lines_byte_for_byte() {
        let content = "// Problem: P\n// Level: Easy\n\tint x = 1;  \n// unrelated: comment\n";
        let result = edit(content, &[("Level", "Hard")]);
        let before = split_lines(content);
        for (idx, line) in result.lines.iter().enumerate() {
            if idx != 1 {
                assert_eq!(line, &before[idx]);
            }
        }
    }

    fn writer() -> MetadataWriter {
        MetadataWriter::new(DashConfig::default())
    }

    #[test]
    fn test_apply_update_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TwoSum.java");
        fs::write(&path, "// Problem: Two Sum\nclass Solution {}\n").unwrap();

        let outcome = writer().apply_update(&path, &patch(&[("Level", "Medium")]));
        assert!(matches!(outcome, UpdateOutcome::Applied { replaced: 0, inserted: 1 }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "// Problem: Two Sum\n// Level: Medium\nclass Solution {}\n"
        );

        let again = writer().apply_update(&path, &patch(&[("Level", "Medium")]));
        assert!(matches!(again, UpdateOutcome::Unchanged));

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_apply_update_missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no/such/File.txt");

        let outcome = writer().apply_update(&path, &patch(&[("Level", "Easy")]));
        assert!(matches!(outcome, UpdateOutcome::Skipped(MetadataError::FileUnwritable { .. })));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_update_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.java");
        fs::write(&path, "// Problem: P\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        writer().apply_update(&path, &patch(&[("Level", "Easy")]));
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}

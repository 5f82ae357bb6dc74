//! Output rendering for scanned records
//!
//! Renderers only read [`Record`]s; the [`OutputGenerator`] writes their output
//! to the paths named in the configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::info;

pub mod html;
pub mod markdown;

pub use html::HtmlRenderer;
pub use markdown::MarkdownRenderer;

use crate::config::DashConfig;
use crate::metadata::Record;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Markdown,
    Html,
    Json,
}

impl RenderFormat {
    pub fn all() -> Vec<RenderFormat> {
        vec![RenderFormat::Markdown, RenderFormat::Html, RenderFormat::Json]
    }
}

impl FromStr for RenderFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(RenderFormat::Markdown),
            "html" => Ok(RenderFormat::Html),
            "json" => Ok(RenderFormat::Json),
            other => anyhow::bail!("Unknown format: {}", other),
        }
    }
}

/// Writes rendered outputs to disk
pub struct OutputGenerator {
    config: DashConfig,
}

impl OutputGenerator {
    pub fn new(config: DashConfig) -> Self {
        Self { config }
    }

    /// Path the JSON dump is written to: the HTML path with a `.json` extension
    pub fn json_path(&self) -> PathBuf {
        self.config.html_path.with_extension("json")
    }

    /// Render `records` in each of `formats` and write the results
    pub fn generate(&self, records: &[Record], formats: &[RenderFormat]) -> Result<Vec<PathBuf>> {
        let mut generated = Vec::new();

        for format in formats {
            let (path, content) = match format {
                RenderFormat::Markdown => (
                    self.config.readme_path.clone(),
                    MarkdownRenderer::new(&self.config).render(records),
                ),
                RenderFormat::Html => {
                    (self.config.html_path.clone(), HtmlRenderer::new(&self.config).render(records))
                }
                RenderFormat::Json => (
                    self.json_path(),
                    serde_json::to_string_pretty(records).context("Failed to serialize records")?,
                ),
            };

            write_output(&path, &content)?;
            generated.push(path);
        }

        info!("Rendered {} records into {} files", records.len(), generated.len());
        Ok(generated)
    }
}

/// Write `content` next to `path` and rename it into place, so readers never
/// see a partially written output.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
            parent
        }
        None => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
    temp.write_all(content.as_bytes()).with_context(|| format!("Failed to write {:?}", path))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .with_context(|| format!("Failed to copy permissions of {:?}", path))?;
    }

    temp.persist(path).with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

/// Record path with forward slashes and no leading `./`
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    text.strip_prefix("./").map(str::to_string).unwrap_or(text)
}

/// Path usable as a link target: spaces and other unsafe bytes percent-encoded
pub fn link_target(path: &Path) -> String {
    let mut encoded = String::new();
    for byte in display_path(path).bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataReader;
    use tempfile::TempDir;

    #[test]
    fn test_format_parsing() {
        assert_eq!("md".parse::<RenderFormat>().unwrap(), RenderFormat::Markdown);
        assert_eq!("HTML".parse::<RenderFormat>().unwrap(), RenderFormat::Html);
        assert!("pdf".parse::<RenderFormat>().is_err());
    }

    #[test]
    fn test_link_target_encodes_spaces() {
        assert_eq!(
            link_target(Path::new("./dsa/Array/Two Sum II.java")),
            "dsa/Array/Two%20Sum%20II.java"
        );
        assert_eq!(display_path(Path::new("./dsa/Trees /A.java")), "dsa/Trees /A.java");
    }

    #[test]
    fn test_generate_writes_every_format() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("dsa");
        std::fs::create_dir_all(root.join("Array")).unwrap();
        std::fs::write(root.join("Array/TwoSum.java"), "// Problem: Two Sum\n// Level: Easy\n")
            .unwrap();

        let mut config = DashConfig::with_root(&root);
        config.readme_path = dir.path().join("README.md");
        config.html_path = dir.path().join("site/index.html");

        let records = MetadataReader::new(config.clone()).scan();
        let files = OutputGenerator::new(config.clone()).generate(&records, &RenderFormat::all()).unwrap();

        assert_eq!(files.len(), 3);
        assert!(std::fs::read_to_string(&config.readme_path).unwrap().contains("Two Sum"));
        assert!(std::fs::read_to_string(&config.html_path).unwrap().contains("Two Sum"));

        let json = std::fs::read_to_string(dir.path().join("site/index.json")).unwrap();
        let parsed: Vec<Record> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].get("Level"), "Easy");
    }

    #[test]
    fn test_write_output_replaces_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "old content that is longer than the new one\n").unwrap();

        write_output(&path, "new\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_output_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_output(&path, "new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

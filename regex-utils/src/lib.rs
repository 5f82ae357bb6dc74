//! Regex utilities for dashgen
//! Extracted to a separate crate for compilation optimization

use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns for `// Key: value` metadata comments
pub mod comment {
    use super::*;

    pub static FIELD_LINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^//\s*([A-Za-z][A-Za-z0-9_-]*):(.*)$").expect("Invalid regex pattern")
    });

    /// Split an already trimmed line into `(name, value)` if it looks like a
    /// metadata comment. The value is trimmed.
    pub fn split_field(line: &str) -> Option<(&str, &str)> {
        let caps = FIELD_LINE.captures(line)?;
        let name = caps.get(1)?.as_str();
        let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        Some((name, value))
    }

    /// Render a metadata comment line without terminator
    pub fn format_field(name: &str, value: &str) -> String {
        format!("// {}: {}", name, value)
    }
}

/// Topic (first directory segment) normalisation
pub mod topic {
    use super::*;

    static EDGE_NOISE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[./\\\s]+|[./\\\s]+$").expect("Invalid regex pattern"));

    /// Lowercase a directory segment and strip dots, slashes and whitespace from
    /// both ends. Returns `None` when nothing is left.
    pub fn normalize(segment: &str) -> Option<String> {
        let cleaned = EDGE_NOISE.replace_all(segment, "").to_lowercase();
        if cleaned.is_empty() { None } else { Some(cleaned) }
    }
}

/// Identifier helpers for generated markup
pub mod slug {
    use super::*;

    static NON_WORD: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex pattern"));

    /// `TimeComplexity` -> `timecomplexity`, `Time Complexity` -> `time-complexity`
    pub fn attribute_name(name: &str) -> String {
        let lower = name.to_lowercase();
        NON_WORD.replace_all(&lower, "-").trim_matches('-').to_string()
    }
}

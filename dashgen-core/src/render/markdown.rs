//! Markdown table output

use super::{display_path, link_target};
use crate::config::DashConfig;
use crate::metadata::Record;

/// Renders records as a Markdown table
pub struct MarkdownRenderer<'a> {
    config: &'a DashConfig,
}

/// Escape characters that would break a table cell
fn cell(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|").replace(['\r', '\n'], " ").trim().to_string()
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(config: &'a DashConfig) -> Self {
        Self { config }
    }

    /// Schema fields shown as their own columns (everything but the anchor)
    fn detail_fields(&self) -> Vec<&'a str> {
        self.config.schema.names().filter(|name| *name != self.config.anchor_field).collect()
    }

    fn shows_pattern_column(&self) -> bool {
        self.config.schema.get("Pattern").is_none()
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["#".to_string(), self.config.anchor_field.clone(), "Solution".to_string()];
        headers.extend(self.detail_fields().into_iter().map(str::to_string));
        if self.shows_pattern_column() {
            headers.push("Pattern".to_string());
        }
        headers
    }

    pub fn row(&self, number: usize, record: &Record) -> Vec<String> {
        let mut row = vec![
            number.to_string(),
            cell(&record.label(&self.config.anchor_field)),
            format!("[Code]({})", link_target(&record.path)),
        ];
        row.extend(self.detail_fields().into_iter().map(|name| cell(record.get(name))));
        if self.shows_pattern_column() {
            row.push(cell(&record.pattern()));
        }
        row
    }

    /// Full document: heading, dashboard link and the table
    pub fn render(&self, records: &[Record]) -> String {
        let mut out = format!("# {}\n\n", self.config.title);

        if records.is_empty() {
            out.push_str("No source files found yet.\n");
            return out;
        }

        out.push_str(&format!(
            "**[Open the interactive dashboard]({})**  \n_Filter by topic and metadata, sort any column, edit in place._\n\n",
            link_target(&self.config.html_path)
        ));

        let headers = self.headers();
        let rows: Vec<Vec<String>> =
            records.iter().enumerate().map(|(i, record)| self.row(i + 1, record)).collect();
        out.push_str(&format_table(&headers, &rows));

        out.push_str(&format!(
            "\n_{} entries from `{}`._\n",
            records.len(),
            display_path(&self.config.root)
        ));
        out
    }
}

/// Pad every column to its widest cell. The `#` column is right-aligned.
pub fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(value.chars().count());
            }
        }
    }

    let pad = |value: &str, width: usize, right: bool| {
        let fill = " ".repeat(width.saturating_sub(value.chars().count()));
        if right { format!("{}{}", fill, value) } else { format!("{}{}", value, fill) }
    };

    let mut table = String::new();

    table.push('|');
    for (i, header) in headers.iter().enumerate() {
        table.push_str(&format!(" {} |", pad(header, widths[i], i == 0)));
    }
    table.push('\n');

    table.push('|');
    for (i, width) in widths.iter().enumerate() {
        let dashes = "-".repeat(width.saturating_sub(1));
        if i == 0 {
            table.push_str(&format!(" {}: |", dashes));
        } else {
            table.push_str(&format!(" :{} |", dashes));
        }
    }
    table.push('\n');

    for row in rows {
        table.push('|');
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            table.push_str(&format!(" {} |", pad(value, widths[i], i == 0)));
        }
        table.push('\n');
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use std::path::PathBuf;

    fn record(path: &str, pairs: &[(&str, &str)]) -> Record {
        let mut record = Record::empty(path, &FieldSchema::default());
        for (k, v) in pairs {
            record.fields.insert(k.to_string(), v.to_string());
        }
        record
    }

    #[test]
    fn test_headers_follow_schema() {
        let config = DashConfig::default();
        let renderer = MarkdownRenderer::new(&config);
        assert_eq!(
            renderer.headers(),
            vec!["#", "Problem", "Solution", "Level", "Revisit", "Notes", "Pattern"]
        );
    }

    #[test]
    fn test_row_contents() {
        let config = DashConfig::default();
        let renderer = MarkdownRenderer::new(&config);
        let rec = record("dsa/Array/Two Sum II.java", &[("Level", "Easy"), ("Notes", "a | b")]);

        let row = renderer.row(3, &rec);
        assert_eq!(row[0], "3");
        assert_eq!(row[1], "Two Sum II");
        assert_eq!(row[2], "[Code](dsa/Array/Two%20Sum%20II.java)");
        assert_eq!(row[3], "Easy");
        assert_eq!(row[5], "a \\| b");
        assert_eq!(row[6], "Two Sum II");
    }

    #[test]
    fn test_render_document() {
        let config = DashConfig::default();
        let records = vec![
            record("dsa/Array/TwoSum.java", &[("Problem", "Two Sum"), ("Level", "Easy")]),
            record("dsa/Trees/Invert.java", &[]),
        ];

        let doc = MarkdownRenderer::new(&config).render(&records);
        assert!(doc.starts_with("# DSA Dashboard\n"));
        assert!(doc.contains("(index.html)"));
        let table_lines: Vec<_> = doc.lines().filter(|l| l.starts_with('|')).collect();
        assert_eq!(table_lines.len(), 4);
        assert!(table_lines[2].contains("Two Sum"));
        assert!(table_lines[3].contains("Invert"));
        assert!(doc.contains("2 entries from `dsa`"));
    }

    #[test]
    fn test_render_empty() {
        let mut config = DashConfig::default();
        config.root = PathBuf::from("solutions");
        let doc = MarkdownRenderer::new(&config).render(&[]);
        assert!(doc.contains("No source files found yet."));
        assert!(!doc.contains('|'));
    }

    #[test]
    fn test_format_table_alignment() {
        let headers = vec!["#".to_string(), "Name".to_string()];
        let rows = vec![vec!["1".to_string(), "foo".to_string()], vec!["10".to_string(), "barbaz".to_string()]];

        let table = format_table(&headers, &rows);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "|   # | Name   |");
        assert_eq!(lines[1], "| --: | :----- |");
        assert_eq!(lines[2], "|   1 | foo    |");
        assert_eq!(lines[3], "|  10 | barbaz |");
    }
}

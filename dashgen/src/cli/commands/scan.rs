//! Scan command: list the records found under the root

use anyhow::{Context, Result};
use dashgen_core::render::display_path;
use dashgen_core::render::markdown::format_table;
use dashgen_core::{DashConfig, Dashboard, Record};

use crate::cli::app::ScanArgs;

pub fn execute(args: ScanArgs, config: DashConfig) -> Result<()> {
    let dashboard = Dashboard::new(config)?;
    let records = dashboard.scan();

    if args.json {
        let json = serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
        println!("{}", json);
        return Ok(());
    }

    if records.is_empty() {
        println!("No source files found under {}", dashboard.config().root.display());
        return Ok(());
    }

    println!("{}", records_table(dashboard.config(), &records));
    println!("{} records", records.len());
    Ok(())
}

/// Plain table: row number, path, topic and every schema field
fn records_table(config: &DashConfig, records: &[Record]) -> String {
    let mut headers = vec!["#".to_string(), "Path".to_string(), "Topic".to_string()];
    headers.extend(config.schema.names().map(str::to_string));

    let rows: Vec<Vec<String>> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut row = vec![
                (i + 1).to_string(),
                display_path(&record.path),
                record.topic_under(&config.root, &config.default_topic),
            ];
            row.extend(config.schema.names().map(|n| record.get(n).to_string()));
            row
        })
        .collect();

    format_table(&headers, &rows)
}

//! Output formatting utilities

use allocatable_lib::{ClusterClass, NodeClass};
use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV on stdout
    Csv,
}

/// Print a table of rows
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Write a header and rows as CSV to any writer
pub fn write_csv_to<W: std::io::Write>(
    writer: W,
    header: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a header and rows to a CSV file
pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv_to(file, header, rows).with_context(|| format!("Failed to write {}", path.display()))
}

/// Print a header and rows as CSV on stdout
pub fn print_csv(header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    write_csv_to(std::io::stdout().lock(), header, rows)
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2}Ti", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Color a cluster label
pub fn color_cluster_class(class: ClusterClass) -> String {
    let label = class.to_string();
    match class {
        ClusterClass::Affected => label.red().to_string(),
        ClusterClass::Unknown => label.yellow().to_string(),
        ClusterClass::Unaffected => label.green().to_string(),
    }
}

/// Color a node label
pub fn color_node_class(class: NodeClass) -> String {
    let label = class.to_string();
    match class {
        NodeClass::Affected => label.red().to_string(),
        NodeClass::Unaffected => label.green().to_string(),
    }
}

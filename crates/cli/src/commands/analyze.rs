//! Per-cluster statistics command

use allocatable_lib::report::{cluster_row, CLUSTER_HEADER};
use allocatable_lib::{AnalysisConfig, AnalysisReport, ClusterStats, Diagnostics};
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::read_report;
use crate::output::{
    format_bytes, format_cpu, print_csv, print_info, print_json, print_success, print_table,
    print_warning, write_csv, OutputFormat,
};

/// Row for the cluster statistics table
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Cluster")]
    identifier: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "CPU Reserved")]
    cpu_reserved: String,
    #[tabled(rename = "Memory Reserved")]
    memory_reserved: String,
    #[tabled(rename = "Node CPU Overage")]
    node_cpu_overage: String,
    #[tabled(rename = "Node Memory Overage")]
    node_memory_overage: String,
    #[tabled(rename = "Cluster CPU Overage")]
    cluster_cpu_overage: String,
    #[tabled(rename = "Cluster Memory Overage")]
    cluster_memory_overage: String,
}

impl From<&ClusterStats> for ClusterRow {
    fn from(stats: &ClusterStats) -> Self {
        Self {
            identifier: stats.identifier.clone().unwrap_or_else(|| "-".to_string()),
            nodes: stats.node_count,
            cpu: format_cpu(stats.cpu.allocatable),
            memory: format_bytes(stats.memory.allocatable),
            cpu_reserved: format_cpu(stats.cpu.reserved),
            memory_reserved: format_bytes(stats.memory.reserved),
            node_cpu_overage: format_cpu(stats.cpu.per_node_overage),
            node_memory_overage: format_bytes(stats.memory.per_node_overage),
            cluster_cpu_overage: format_cpu(stats.cpu.cluster_overage),
            cluster_memory_overage: format_bytes(stats.memory.cluster_overage),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    generated_at: DateTime<Utc>,
    source: String,
    reservation_policy: String,
    diagnostics: &'a Diagnostics,
    clusters: Vec<&'a ClusterStats>,
}

/// Analyze a log file and print per-cluster statistics
pub fn run(
    path: &Path,
    csv_output: Option<&Path>,
    bounded_only: bool,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<()> {
    let report = read_report(path, config)?;
    let selected: Vec<&ClusterStats> = if bounded_only {
        report.overage_bounded().map(|c| &c.stats).collect()
    } else {
        report.clusters.iter().map(|c| &c.stats).collect()
    };
    let rows: Vec<Vec<String>> = selected.iter().map(|stats| cluster_row(stats)).collect();

    if let Some(csv_path) = csv_output {
        write_csv(csv_path, &CLUSTER_HEADER, &rows)?;
    }

    match format {
        OutputFormat::Json => {
            print_json(&AnalyzeOutput {
                generated_at: Utc::now(),
                source: path.display().to_string(),
                reservation_policy: config.reservation_policy.to_string(),
                diagnostics: &report.diagnostics,
                clusters: selected,
            })?;
        }
        OutputFormat::Csv => {
            print_csv(&CLUSTER_HEADER, &rows)?;
        }
        OutputFormat::Table => {
            println!("{}", "Cluster Allocatable Statistics".bold());
            println!("{}", "=".repeat(50));
            println!("Source:                 {}", path.display().to_string().cyan());
            println!("Reservation policy:     {}", config.reservation_policy);
            if bounded_only {
                println!("Filter:                 {}", "overage within reservation".cyan());
            }
            println!();

            let table_rows: Vec<ClusterRow> =
                selected.iter().map(|stats| ClusterRow::from(*stats)).collect();
            print_table(&table_rows);
            println!();

            print_diagnostics(&report);

            if let Some(csv_path) = csv_output {
                print_success(&format!(
                    "Wrote {} rows to {}",
                    rows.len(),
                    csv_path.display()
                ));
            }
        }
    }

    Ok(())
}

fn print_diagnostics(report: &AnalysisReport) {
    let d = &report.diagnostics;
    print_info(&format!(
        "{} lines read, {} clusters, {} nodes",
        d.lines_read,
        d.chunks_parsed,
        report.node_count()
    ));
    if d.chunks_skipped > 0 {
        print_info(&format!("{} lines were not node snapshots", d.chunks_skipped));
    }
    if d.malformed_node_lines + d.dropped_nodes > 0 {
        print_warning(&format!(
            "{} node lines skipped ({} with malformed quantities)",
            d.malformed_node_lines + d.dropped_nodes,
            d.dropped_nodes
        ));
    }
    if d.empty_chunks > 0 {
        print_warning(&format!("{} snapshots had no valid nodes", d.empty_chunks));
    }
    if d.zero_allocatable > 0 {
        print_warning(&format!(
            "{} node resources reported zero allocatable and count as 0%",
            d.zero_allocatable
        ));
    }
}

//! Threshold classification command

use allocatable_lib::{
    classify_cluster, classify_node, AggregateStats, AnalysisConfig, ClusterClass, NodeClass,
    NodeUtilization, Thresholds,
};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::read_report;
use crate::output::{
    color_cluster_class, color_node_class, print_csv, print_json, print_table, OutputFormat,
};

/// Row for the cluster classification table
#[derive(Tabled)]
struct ClusterClassRow {
    #[tabled(rename = "Cluster")]
    identifier: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "Max Mem %")]
    max_memory: u64,
    #[tabled(rename = "Mean Mem %")]
    mean_memory: u64,
    #[tabled(rename = "Max CPU %")]
    max_cpu: u64,
    #[tabled(rename = "Mean CPU %")]
    mean_cpu: u64,
    #[tabled(rename = "Class")]
    class: String,
}

/// Row for the node classification table
#[derive(Tabled)]
struct NodeClassRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Memory %")]
    memory: u64,
    #[tabled(rename = "CPU %")]
    cpu: u64,
    #[tabled(rename = "Class")]
    class: String,
}

#[derive(Serialize)]
struct ClusterLabel {
    identifier: Option<String>,
    node_count: usize,
    class: ClusterClass,
}

#[derive(Serialize)]
struct NodeLabel<'a> {
    #[serde(flatten)]
    utilization: &'a NodeUtilization,
    class: NodeClass,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    thresholds: Thresholds,
    counts: &'a AggregateStats,
    clusters: Vec<ClusterLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nodes: Option<Vec<NodeLabel<'a>>>,
}

const CSV_HEADER: [&str; 7] = [
    "Identifier",
    "Nodes",
    "Max Memory Percent",
    "Mean Memory Percent",
    "Max CPU Percent",
    "Mean CPU Percent",
    "Class",
];

/// Label clusters (and optionally nodes) against the configured thresholds
pub fn run(
    path: &Path,
    show_nodes: bool,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<()> {
    let thresholds = config.thresholds()?;
    let report = read_report(path, config)?;
    let utilizations = report.node_utilizations();
    let counts = report.aggregate(thresholds);

    let labels: Vec<ClusterLabel> = report
        .clusters
        .iter()
        .map(|c| ClusterLabel {
            identifier: c.stats.identifier.clone(),
            node_count: c.stats.node_count,
            class: classify_cluster(&c.stats, thresholds),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let nodes = show_nodes.then(|| {
                utilizations
                    .iter()
                    .map(|utilization| NodeLabel {
                        utilization,
                        class: classify_node(utilization, thresholds),
                    })
                    .collect()
            });
            print_json(&ClassifyOutput {
                thresholds,
                counts: &counts,
                clusters: labels,
                nodes,
            })?;
        }
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = report
                .clusters
                .iter()
                .zip(&labels)
                .map(|(c, label)| {
                    vec![
                        c.stats.identifier.clone().unwrap_or_default(),
                        c.stats.node_count.to_string(),
                        c.stats.memory.max_percent.to_string(),
                        c.stats.memory.mean_percent.to_string(),
                        c.stats.cpu.max_percent.to_string(),
                        c.stats.cpu.mean_percent.to_string(),
                        label.class.to_string(),
                    ]
                })
                .collect();
            print_csv(&CSV_HEADER, &rows)?;
        }
        OutputFormat::Table => {
            println!("{}", "Cluster Classification".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Thresholds:             memory {}%, cpu {}%",
                thresholds.memory, thresholds.cpu
            );
            println!();

            let rows: Vec<ClusterClassRow> = report
                .clusters
                .iter()
                .zip(&labels)
                .map(|(c, label)| ClusterClassRow {
                    identifier: c.stats.identifier.clone().unwrap_or_else(|| "-".to_string()),
                    nodes: c.stats.node_count,
                    max_memory: c.stats.memory.max_percent,
                    mean_memory: c.stats.memory.mean_percent,
                    max_cpu: c.stats.cpu.max_percent,
                    mean_cpu: c.stats.cpu.mean_percent,
                    class: color_cluster_class(label.class),
                })
                .collect();
            print_table(&rows);
            println!();

            if show_nodes {
                println!("{}", "Nodes".bold());
                println!("{}", "-".repeat(50));
                let rows: Vec<NodeClassRow> = utilizations
                    .iter()
                    .map(|u| NodeClassRow {
                        name: u.name.clone(),
                        memory: u.memory_percent,
                        cpu: u.cpu_percent,
                        class: color_node_class(classify_node(u, thresholds)),
                    })
                    .collect();
                print_table(&rows);
                println!();
            }

            print_counts(&counts);
        }
    }

    Ok(())
}

fn print_counts(counts: &AggregateStats) {
    println!("{}", "Summary".bold());
    println!("{}", "-".repeat(50));
    for class in ClusterClass::ALL {
        let average = counts
            .average_cluster_size(class)
            .map(|size| format!(", {} nodes on average", size))
            .unwrap_or_default();
        println!(
            "{:<24}{} ({} nodes{})",
            format!("Clusters {}:", class),
            counts.clusters(class),
            counts.nodes_in_clusters(class),
            average
        );
    }
    println!(
        "{:<24}{}",
        "Nodes affected:",
        counts.nodes(NodeClass::Affected).to_string().red()
    );
    println!(
        "{:<24}{}",
        "Nodes unaffected:",
        counts.nodes(NodeClass::Unaffected).to_string().green()
    );
}

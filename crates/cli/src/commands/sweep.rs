//! Threshold sweep command

use allocatable_lib::report::DistributionTable;
use allocatable_lib::{
    sweep, sweep_parallel, AggregateStats, AnalysisConfig, StructuredLogger, SweepAxis, SweepPlan,
};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::read_report;
use crate::output::{print_csv, print_info, print_json, print_success, write_csv, OutputFormat};

pub struct SweepOptions {
    pub axis: SweepAxis,
    pub fixed: u64,
    pub output_dir: PathBuf,
    pub parallel: bool,
}

/// Sweep the chosen threshold and write the four distribution tables
pub async fn run(
    path: &Path,
    options: SweepOptions,
    config: &AnalysisConfig,
    format: OutputFormat,
) -> Result<()> {
    let plan = SweepPlan::new(options.axis, options.fixed)?;
    let report = read_report(path, config)?;
    let logger = StructuredLogger::new(path.display().to_string());

    let start = Instant::now();
    let rows = if options.parallel {
        sweep_parallel(
            Arc::from(report.stats()),
            Arc::from(report.node_utilizations()),
            plan.clone(),
        )
        .await?
    } else {
        sweep(&report.stats(), &report.node_utilizations(), &plan)
    };
    logger.log_sweep_complete(
        &plan.axis().to_string(),
        rows.len(),
        options.parallel,
        start.elapsed().as_secs_f64(),
    );

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!("Failed to create {}", options.output_dir.display())
    })?;
    let mut written = Vec::new();
    for table in DistributionTable::ALL {
        let file = options.output_dir.join(table.file_name());
        write_csv(&file, table.header(), &table_rows(table, &rows))?;
        written.push(file);
    }

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv => {
            let table = DistributionTable::Clusters;
            print_csv(table.header(), &table_rows(table, &rows))?;
        }
        OutputFormat::Table => {
            println!("{}", "Threshold Sweep".bold());
            println!("{}", "=".repeat(50));
            println!("Source:                 {}", path.display().to_string().cyan());
            println!("Sweeping:               {} threshold", plan.axis());
            if plan.axis() != SweepAxis::Both {
                println!("Fixed threshold:        {}%", plan.fixed());
            }
            println!(
                "Clusters / nodes:       {} / {}",
                report.clusters.len(),
                report.node_count()
            );
            println!();
            for file in &written {
                print_success(&format!("Wrote {}", file.display()));
            }
            print_info(&format!("{} threshold pairs evaluated", rows.len()));
        }
    }

    Ok(())
}

fn table_rows(table: DistributionTable, rows: &[AggregateStats]) -> Vec<Vec<String>> {
    rows.iter().map(|row| table.row(row)).collect()
}

//! Subcommand implementations

pub mod analyze;
pub mod classify;
pub mod reserve;
pub mod sweep;

use allocatable_lib::{AnalysisConfig, AnalysisReport, Analyzer};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Run the analyzer over a log file
pub(crate) fn read_report(path: &Path, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let analyzer = Analyzer::new(config.clone()).with_source(path.display().to_string());
    analyzer
        .analyze_reader(BufReader::new(file))
        .with_context(|| format!("Failed to analyze {}", path.display()))
}

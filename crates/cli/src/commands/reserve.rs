//! Reservation lookup command

use allocatable_lib::{AnalysisConfig, Quantity, Resource};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_bytes, format_cpu, print_csv, print_json, print_table, OutputFormat};

/// Row for the reservation table
#[derive(Tabled, Serialize)]
struct ReservationRow {
    #[tabled(rename = "Resource")]
    resource: Resource,
    #[tabled(rename = "Policy")]
    policy: String,
    #[tabled(rename = "Capacity")]
    #[serde(rename = "capacity")]
    capacity_display: String,
    #[tabled(rename = "Reserved")]
    #[serde(rename = "reserved")]
    reserved_display: String,
    #[tabled(rename = "Schedulable")]
    #[serde(rename = "schedulable")]
    schedulable_display: String,
    #[tabled(skip)]
    unit: &'static str,
    #[tabled(skip)]
    capacity_amount: u64,
    #[tabled(skip)]
    reserved_amount: u64,
}

/// Print the reservation for a node with the given allocatable capacity
pub fn run(memory: &str, cpu: &str, config: &AnalysisConfig, format: OutputFormat) -> Result<()> {
    let policies = config.policies();

    let mut rows = Vec::new();
    for (resource, text) in [(Resource::Memory, memory), (Resource::Cpu, cpu)] {
        let quantity: Quantity = text
            .parse()
            .with_context(|| format!("Invalid {} quantity {:?}", resource, text))?;
        let capacity = resource.amount(&quantity);
        let reserved = policies.reserved(resource, capacity);
        let display = |amount: u64| match resource {
            Resource::Cpu => format_cpu(amount),
            Resource::Memory => format_bytes(amount),
        };
        rows.push(ReservationRow {
            resource,
            policy: policies.policy(resource).name().to_string(),
            capacity_display: display(capacity),
            reserved_display: display(reserved),
            schedulable_display: display(capacity.saturating_sub(reserved)),
            unit: resource.unit(),
            capacity_amount: capacity,
            reserved_amount: reserved,
        });
    }

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv => {
            let csv_rows: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    vec![
                        row.resource.to_string(),
                        row.policy.clone(),
                        row.unit.to_string(),
                        row.capacity_amount.to_string(),
                        row.reserved_amount.to_string(),
                    ]
                })
                .collect();
            print_csv(&["Resource", "Policy", "Unit", "Capacity", "Reserved"], &csv_rows)?;
        }
        OutputFormat::Table => {
            println!("{}", "System Reservation".bold());
            println!("{}", "=".repeat(50));
            print_table(&rows);
        }
    }

    Ok(())
}

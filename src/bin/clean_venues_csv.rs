// src/bin/clean_venues_csv.rs
use anyhow::{Context, Result};
use std::{env, path::Path, process::exit};
use tracing::info;
use venue_tools::{
    logging,
    repair::{self, RepairReport},
    RepairError,
};

fn main() {
    logging::init("warn,venue_tools=info");

    // Expect exactly two arguments: input and output CSV paths.
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <input.csv> <output.csv>", args[0]);
        exit(1);
    }
    let input = Path::new(&args[1]);
    let output = Path::new(&args[2]);

    if !input.exists() {
        eprintln!("Error: Input file '{}' does not exist.", input.display());
        exit(1);
    }

    match run(input, output) {
        Ok(report) => print_summary(&report),
        Err(e) => {
            match e.downcast_ref::<RepairError>() {
                Some(RepairError::MissingColumn { column }) => {
                    eprintln!("Error: Could not find '{}' column in the CSV file.", column)
                }
                _ => eprintln!("Error: {:#}", e),
            }
            exit(1);
        }
    }
}

fn run(input: &Path, output: &Path) -> Result<RepairReport> {
    // length is set by the pre-scan inside the repair
    let pb = repair::progress_bar(0);
    let report = repair::repair_csv_with_progress(input, output, &pb)?;
    info!(
        report = %serde_json::to_string(&report).context("serializing report")?,
        "run summary"
    );
    Ok(report)
}

fn print_summary(report: &RepairReport) {
    println!("\n\nProcessing complete:");
    println!("Total records processed: {}", report.rows_processed);
    println!("Problematic rows fixed: {}", report.rows_repaired);
    println!("Rows truncated: {}", report.rows_truncated);
    println!("Rows dropped: {}", report.rows_dropped);
    println!("Input file size: {:.2} MB", report.input_mb());
    println!("Output file size: {:.2} MB", report.output_mb());
    println!("Cleaned file saved as: {}", report.output.display());
}

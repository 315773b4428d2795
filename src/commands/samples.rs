//! Samples command implementation.
//!
//! The samples command:
//! 1. Reads folded stacks
//! 2. Aggregates them into a count tree
//! 3. Calculates hot paths
//! 4. Writes the report

use super::models::SamplesArgs;
use super::utils::{emit_report, validate_input_path, validate_top_paths};
use crate::aggregator::build_profiling_group;
use crate::output::{CallGraphReport, GroupSummary};
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

/// Execute the samples command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The report that was written
///
/// # Errors
/// * Input file missing or malformed
/// * File write errors
pub fn execute_samples(args: &SamplesArgs) -> Result<CallGraphReport> {
    let start_time = Instant::now();

    info!("Aggregating stack samples from: {}", args.input.display());

    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let group = build_profiling_group(&args.name, BufReader::new(file), args.order)
        .context("Failed to aggregate stack samples")?;

    debug!(
        "Aggregated {} samples into {} top-level frames",
        group.sample_count(),
        group.group().children().count()
    );

    let summary = GroupSummary::from_group(group.group(), args.top_paths);
    info!("Sample distribution: {}", summary.distribution.summary());

    let report = CallGraphReport::new(vec![summary], true);
    emit_report(&report, args.output.as_deref(), args.print_summary, args.top_paths)?;

    info!(
        "Samples aggregated in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(report)
}

/// Validate samples arguments
///
/// **Public** - can be called before execute_samples for early validation
pub fn validate_samples_args(args: &SamplesArgs) -> Result<()> {
    validate_input_path(&args.input)?;

    if args.name.trim().is_empty() {
        anyhow::bail!("Group name cannot be empty");
    }

    validate_top_paths(args.top_paths)
}

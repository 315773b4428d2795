use crate::output::{
    generate_text_summary, read_report, render_tree, report_to_string, write_report,
    CallGraphReport,
};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

/// Write or print a report, then the optional text summary
pub fn emit_report(
    report: &CallGraphReport,
    output: Option<&Path>,
    print_summary: bool,
    top_paths: usize,
) -> Result<()> {
    match output {
        Some(path) => {
            write_report(report, path).context("Failed to write report JSON")?;
            info!("✓ Report written to: {}", path.display());
        }
        None => println!("{}", report_to_string(report)?),
    }

    if print_summary {
        for group in &report.groups {
            println!("\n{}", "=".repeat(80));
            println!("{}", render_tree(group, None));
            println!("\n{}", generate_text_summary(group, top_paths));
            println!("{}", "=".repeat(80));
        }
        if !report.completed {
            println!("(partial result: the run did not complete)");
        }
    }
    Ok(())
}

pub fn validate_input_path(input: &Path) -> Result<()> {
    if input.as_os_str().is_empty() {
        anyhow::bail!("Input path cannot be empty");
    }
    if !input.is_file() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(())
}

pub fn validate_top_paths(top_paths: usize) -> Result<()> {
    if top_paths == 0 {
        anyhow::bail!("top_paths must be greater than 0");
    }
    if top_paths > 1000 {
        anyhow::bail!("top_paths is too large (max 1000)");
    }
    Ok(())
}

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at);
    println!("  Completed: {}", report.completed);
    println!("  Groups: {}", report.groups.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Callgraph Studio Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string          - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string     - RFC 3339 timestamp");
        println!("  completed: bool          - False if the run was cancelled");
        println!("  groups: array            - One entry per group");
        println!("    id, name: number, string");
        println!("    parent: string?        - Parent element name");
        println!("    host_id: string        - Host of the element");
        println!("    root: call site        - Group root and its callees");
        println!("      symbol: string       - Function symbol");
        println!("      symbol_type: string  - integer, long or string");
        println!("      depth: number        - 0 for the root, 1 for top-level calls");
        println!("      calls: number        - Calls or samples");
        println!("      duration: number?    - Total duration");
        println!("      self_time: number?   - Duration minus callee durations");
        println!("      cpu_time: number?    - Resolved CPU time");
        println!("      statistics: object?  - count/min/max/total/mean/std_dev per metric");
        println!("      children: array      - Callees, heaviest first");
        println!("    hot_paths: array       - Heaviest call paths");
        println!("    distribution: object   - Weight distribution over paths");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Callgraph Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call graph aggregation for interval traces and stack samples.");
}

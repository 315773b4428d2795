//! Callgraph Studio CLI
//!
//! Aggregates interval traces and sampled stacks into call graphs.
//! Writes versioned JSON reports and text summaries.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use callgraph_studio::aggregator::FrameOrder;
use callgraph_studio::callgraph::GroupBy;
use callgraph_studio::commands::{
    display_schema, display_version, execute_intervals, execute_samples, validate_intervals_args,
    validate_report_file, validate_samples_args, IntervalsArgs, SamplesArgs,
};

/// Callgraph Studio - call graph aggregation for traces and samples
#[derive(Parser, Debug)]
#[command(name = "callgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate folded stack samples into a count tree
    Samples {
        /// Folded stack file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the JSON report (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Name of the resulting group
        #[arg(long, default_value = "samples")]
        name: String,

        /// Frames are listed innermost first
        #[arg(long)]
        leaf_first: bool,

        /// Number of top hot paths to include
        #[arg(long, default_value = "20")]
        top_paths: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Build a call graph from a JSON interval dump
    Intervals {
        /// Interval dump file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the JSON report (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Group elements by leaf, parent or all
        #[arg(long, default_value = "leaf")]
        group_by: GroupBy,

        /// Build elements on worker threads
        #[arg(long)]
        parallel: bool,

        /// Number of top hot paths to include
        #[arg(long, default_value = "20")]
        top_paths: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Samples {
            input,
            output,
            name,
            leaf_first,
            top_paths,
            summary,
        } => {
            let args = SamplesArgs {
                input,
                output,
                name,
                order: if leaf_first {
                    FrameOrder::LeafFirst
                } else {
                    FrameOrder::RootFirst
                },
                top_paths,
                print_summary: summary,
            };

            validate_samples_args(&args)?;
            execute_samples(&args)?;
        }

        Commands::Intervals {
            input,
            output,
            group_by,
            parallel,
            top_paths,
            summary,
        } => {
            let args = IntervalsArgs {
                input,
                output,
                group_by,
                parallel,
                top_paths,
                print_summary: summary,
            };

            validate_intervals_args(&args)?;
            execute_intervals(&args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

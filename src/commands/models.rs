use crate::aggregator::FrameOrder;
use crate::callgraph::GroupBy;
use crate::utils::config::DEFAULT_TOP_PATHS;
use std::path::PathBuf;

/// Arguments for the samples command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct SamplesArgs {
    /// Folded stack file, one `frame;frame;frame count` per line
    pub input: PathBuf,

    /// Output path for the JSON report (stdout when absent)
    pub output: Option<PathBuf>,

    /// Name of the resulting group
    pub name: String,

    /// Order of the frames on each input line
    pub order: FrameOrder,

    /// Number of top hot paths to include in the report
    pub top_paths: usize,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for SamplesArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("stacks.folded"),
            output: None,
            name: "samples".to_string(),
            order: FrameOrder::RootFirst,
            top_paths: DEFAULT_TOP_PATHS,
            print_summary: false,
        }
    }
}

/// Arguments for the intervals command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct IntervalsArgs {
    /// JSON interval dump
    pub input: PathBuf,

    /// Output path for the JSON report (stdout when absent)
    pub output: Option<PathBuf>,

    /// How leaf element groups are combined
    pub group_by: GroupBy,

    /// Build elements on worker threads
    pub parallel: bool,

    /// Number of top hot paths to include in the report
    pub top_paths: usize,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for IntervalsArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("intervals.json"),
            output: None,
            group_by: GroupBy::Leaf,
            parallel: false,
            top_paths: DEFAULT_TOP_PATHS,
            print_summary: false,
        }
    }
}

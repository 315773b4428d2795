//! Intervals command implementation.
//!
//! The intervals command:
//! 1. Loads a JSON interval dump into in-memory interval sources
//! 2. Builds the call graph, one group per element
//! 3. Regroups the result
//! 4. Writes the report
//!
//! Dump format:
//! ```json
//! {
//!   "elements": [
//!     {
//!       "name": "thread-1",
//!       "parent": "process-1",
//!       "process_id": 1,
//!       "thread_id": 1,
//!       "depths": [
//!         [{ "start": 0, "end": 100, "value": "main" }],
//!         [{ "start": 10, "end": 40, "value": 4096 }]
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::models::IntervalsArgs;
use super::utils::{emit_report, validate_input_path, validate_top_paths};
use crate::callgraph::{group_nodes, CallGraphBuilder, CallGraphConfig};
use crate::callstack::{CallStack, CallStackElement, MemoryIntervalSource, StateValue};
use crate::model::ModelRegistry;
use crate::output::{CallGraphReport, GroupSummary};
use crate::utils::config::{DEFAULT_HOST_ID, DEFAULT_SYMBOL_KEY, UNKNOWN_TID};
use crate::utils::error::InputError;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Interval dump read by the intervals command
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalDump {
    pub elements: Vec<ElementDump>,
}

/// One leaf element of an interval dump
#[derive(Debug, Clone, Deserialize)]
pub struct ElementDump {
    pub name: String,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_process_id")]
    pub process_id: i32,

    #[serde(default = "default_thread_id")]
    pub thread_id: i32,

    /// Intervals per depth, depth 1 first
    pub depths: Vec<Vec<IntervalDumpEntry>>,
}

/// One `[start, end)` interval
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalDumpEntry {
    pub start: i64,
    pub end: i64,
    pub value: StateValue,
}

fn default_host() -> String {
    DEFAULT_HOST_ID.to_string()
}

fn default_process_id() -> i32 {
    DEFAULT_SYMBOL_KEY
}

fn default_thread_id() -> i32 {
    UNKNOWN_TID
}

impl ElementDump {
    /// Load this element into its own in-memory interval source
    ///
    /// # Errors
    /// * `InputError::Interval` - an interval has `start > end`
    pub fn into_element(self) -> Result<CallStackElement, InputError> {
        let start = self
            .depths
            .iter()
            .flatten()
            .map(|interval| interval.start)
            .min()
            .unwrap_or(0);
        let mut source = MemoryIntervalSource::new(start, start);
        let handles = source.add_attributes(self.depths.len());

        for (handle, intervals) in handles.iter().zip(self.depths) {
            for interval in intervals {
                source.push_interval(*handle, interval.start, interval.end, interval.value)?;
            }
        }

        let process_id = self.process_id;
        let thread_id = self.thread_id;
        let call_stack = CallStack::new(Arc::new(source), handles)
            .with_symbol_key(Arc::new(move |_: i64| process_id))
            .with_thread_id(Arc::new(move |_: i64| thread_id))
            .with_host_id(self.host);

        let element = CallStackElement::new(self.name, call_stack);
        Ok(match self.parent {
            Some(parent) => element.with_parent(parent),
            None => element,
        })
    }
}

/// Parse an interval dump into call stack elements
///
/// **Public** - also used by tests
///
/// # Errors
/// * `InputError::Io` - reading failed
/// * `InputError::Json` - malformed dump
/// * `InputError::Interval` - an interval has `start > end`
pub fn load_elements<R: Read>(reader: R) -> Result<Vec<CallStackElement>, InputError> {
    let dump: IntervalDump = serde_json::from_reader(reader)?;
    debug!("Loaded interval dump with {} elements", dump.elements.len());
    dump.elements
        .into_iter()
        .map(ElementDump::into_element)
        .collect()
}

/// Execute the intervals command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The report that was written
///
/// # Errors
/// * Input file missing or malformed
/// * Malformed nesting in the intervals (negative self time)
/// * File write errors
pub fn execute_intervals(args: &IntervalsArgs) -> Result<CallGraphReport> {
    let start_time = Instant::now();

    info!("Loading intervals from: {}", args.input.display());
    let elements = open_elements(&args.input)?;

    let registry = ModelRegistry::new();
    let config = CallGraphConfig::new().with_parallel(args.parallel);
    let graph = CallGraphBuilder::new(&registry)
        .with_config(config)
        .build(&elements)
        .context("Failed to build call graph")?;

    let groups = group_nodes(graph.groups(), args.group_by)
        .context("Failed to group call graph")?;
    info!(
        "Grouped {} elements by {} into {} groups",
        elements.len(),
        args.group_by,
        groups.len()
    );

    let summaries = groups
        .iter()
        .map(|group| GroupSummary::from_group(group, args.top_paths))
        .collect();
    let report = CallGraphReport::new(summaries, graph.is_completed());
    emit_report(&report, args.output.as_deref(), args.print_summary, args.top_paths)?;

    info!(
        "Call graph built in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(report)
}

fn open_elements(path: &Path) -> Result<Vec<CallStackElement>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    load_elements(BufReader::new(file))
        .with_context(|| format!("Failed to load intervals from {}", path.display()))
}

/// Validate intervals arguments
///
/// **Public** - can be called before execute_intervals for early validation
pub fn validate_intervals_args(args: &IntervalsArgs) -> Result<()> {
    validate_input_path(&args.input)?;
    validate_top_paths(args.top_paths)
}

//! Build count-based aggregation trees from sampled stack traces.
//!
//! Each sample is a call chain such as `main;execute;storage_read`. The
//! chain becomes a single path of count nodes, built innermost frame first
//! and wrapped outward, which is then merged into the group's forest by
//! symbol. Repeated prefixes therefore share nodes and sum their counts.
//!
//! Folded stack input: "parent;child;grandchild weight"
//!
//! Example: "main;execute;storage_read 1000"
//! This means: main called execute which called storage_read, sampled 1000 times.

use super::call_site::AggregatedCallSite;
use super::group::GroupNode;
use crate::callstack::Symbol;
use crate::utils::config::FOLDED_FRAME_SEPARATOR;
use crate::utils::error::{AggregationError, InputError};
use log::debug;
use std::io::BufRead;

/// Order in which a sampler reports the frames of one stack trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameOrder {
    /// Callers before callees (folded stack order)
    #[default]
    RootFirst,
    /// Innermost frame first (native unwinder order)
    LeafFirst,
}

/// Aggregation group fed with sampled stack traces
///
/// **Public** - entry point of the sampled modality
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilingGroup {
    group: GroupNode,
}

impl ProfilingGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(0, name)
    }

    pub fn with_id(id: usize, name: impl Into<String>) -> Self {
        let name = name.into();
        let root = AggregatedCallSite::stack_frame(name.as_str(), 0, 0);
        Self {
            group: GroupNode::with_root(id, name, root),
        }
    }

    /// Add one root-first stack trace
    ///
    /// # Errors
    /// * `AggregationError` - never for traces built through this type
    pub fn add_stack_trace<I, S>(&mut self, frames: I) -> Result<(), AggregationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.add_weighted_stack_trace(frames, FrameOrder::RootFirst, 1)
    }

    /// Add one stack trace captured in `order`
    ///
    /// # Errors
    /// * `AggregationError` - never for traces built through this type
    pub fn add_stack_trace_ordered<I, S>(
        &mut self,
        frames: I,
        order: FrameOrder,
    ) -> Result<(), AggregationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.add_weighted_stack_trace(frames, order, 1)
    }

    /// Add `weight` occurrences of the same stack trace in one step
    ///
    /// **Public** - main entry point for sample aggregation
    ///
    /// # Arguments
    /// * `frames` - Frame symbols of one sample
    /// * `order` - Order the frames are listed in
    /// * `weight` - Number of occurrences
    ///
    /// An empty trace or a zero weight is a no-op.
    ///
    /// # Errors
    /// * `AggregationError` - never for traces built through this type
    pub fn add_weighted_stack_trace<I, S>(
        &mut self,
        frames: I,
        order: FrameOrder,
        weight: u64,
    ) -> Result<(), AggregationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let mut frames: Vec<Symbol> = frames.into_iter().map(Into::into).collect();
        if frames.is_empty() || weight == 0 {
            return Ok(());
        }
        if order == FrameOrder::LeafFirst {
            frames.reverse();
        }

        let mut chain: Option<AggregatedCallSite> = None;
        for (index, symbol) in frames.into_iter().enumerate().rev() {
            let mut node = AggregatedCallSite::stack_frame(symbol, index as u32 + 1, weight);
            if let Some(child) = chain.take() {
                node.add_child(child)?;
            }
            chain = Some(node);
        }

        let root = self.group.root_mut();
        let mut sample = AggregatedCallSite::stack_frame(root.symbol().clone(), 0, weight);
        if let Some(chain) = chain {
            sample.add_child(chain)?;
        }
        root.merge(sample)
    }

    /// Total number of samples added
    pub fn sample_count(&self) -> u64 {
        self.group.root().count().unwrap_or(0)
    }

    pub fn group(&self) -> &GroupNode {
        &self.group
    }

    pub fn into_group(self) -> GroupNode {
        self.group
    }
}

/// Parse one folded stack line
///
/// **Public** - used by the `samples` command
///
/// # Arguments
/// * `line` - Text such as `main;execute 12`; the weight is optional and
///   defaults to 1
/// * `line_number` - 1-based line number for error reporting
///
/// # Returns
/// `None` for blank lines and `#` comments, otherwise the root-first frames
/// and the weight
///
/// # Errors
/// * `InputError::InvalidLine` - empty frame or malformed weight
pub fn parse_folded_line(
    line: &str,
    line_number: usize,
) -> Result<Option<(Vec<Symbol>, u64)>, InputError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (stack, weight) = match line.rsplit_once(char::is_whitespace) {
        Some((stack, weight)) => {
            let weight = weight.parse::<u64>().map_err(|_| InputError::InvalidLine {
                line: line_number,
                reason: format!("invalid sample weight '{}'", weight),
            })?;
            (stack.trim_end(), weight)
        }
        None => (line, 1),
    };

    let mut frames = Vec::new();
    for frame in stack.split(FOLDED_FRAME_SEPARATOR) {
        if frame.trim().is_empty() {
            return Err(InputError::InvalidLine {
                line: line_number,
                reason: "empty frame".to_string(),
            });
        }
        frames.push(Symbol::from_frame(frame));
    }
    Ok(Some((frames, weight)))
}

/// Build a profiling group from folded stack text
///
/// **Public** - main entry point for folded input
///
/// # Arguments
/// * `name` - Group name
/// * `reader` - One folded stack per line
/// * `order` - Order of the frames on each line
///
/// # Errors
/// * `InputError::Io` - reading failed
/// * `InputError::InvalidLine` - a line could not be parsed
pub fn build_profiling_group<R: BufRead>(
    name: &str,
    reader: R,
    order: FrameOrder,
) -> Result<ProfilingGroup, InputError> {
    let mut group = ProfilingGroup::new(name);
    let mut lines = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some((frames, weight)) = parse_folded_line(&line, index + 1)? {
            group.add_weighted_stack_trace(frames, order, weight)?;
            lines += 1;
        }
    }

    debug!(
        "Built profiling group '{}' from {} stacks ({} samples)",
        name,
        lines,
        group.sample_count()
    );
    Ok(group)
}

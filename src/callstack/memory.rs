//! In-memory interval source.
//!
//! Stores non-null intervals per depth attribute, sorted by start time.
//! Used by the CLI to replay interval dumps and by tests as a fixture;
//! production sources implement [`IntervalSource`] over their own storage.

use super::source::{DepthHandle, IntervalSource, StateInterval, StateValue};
use crate::utils::error::{FunctionError, PushError, SourceError};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

/// Interval source backed by vectors
#[derive(Debug, Default)]
pub struct MemoryIntervalSource {
    start_time: i64,
    end_time: i64,
    attributes: Vec<Vec<StateInterval>>,
    disposed: AtomicBool,
}

impl MemoryIntervalSource {
    /// Create an empty source covering `[start_time, end_time)`
    pub fn new(start_time: i64, end_time: i64) -> Self {
        Self {
            start_time,
            end_time: end_time.max(start_time),
            attributes: Vec::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Add a new depth attribute and return its handle
    pub fn add_attribute(&mut self) -> DepthHandle {
        self.attributes.push(Vec::new());
        self.attributes.len() - 1
    }

    /// Add `count` attributes, returning their handles in depth order
    pub fn add_attributes(&mut self, count: usize) -> Vec<DepthHandle> {
        (0..count).map(|_| self.add_attribute()).collect()
    }

    /// Record that `value` is active on `[start, end)` for `handle`
    ///
    /// The source's time range grows to cover the new interval.
    ///
    /// # Errors
    /// * `PushError::Range` - `start > end`
    /// * `PushError::Source` - handle was never added
    pub fn push_interval(
        &mut self,
        handle: DepthHandle,
        start: i64,
        end: i64,
        value: StateValue,
    ) -> Result<(), PushError> {
        if start > end {
            return Err(PushError::Range(FunctionError::InvalidRange { start, end }));
        }
        let intervals = self
            .attributes
            .get_mut(handle)
            .ok_or(PushError::Source(SourceError::UnknownAttribute(handle)))?;

        let position = intervals.partition_point(|iv| iv.start <= start);
        intervals.insert(position, StateInterval::new(start, end, Some(value)));

        self.start_time = self.start_time.min(start);
        self.end_time = self.end_time.max(end);
        Ok(())
    }

    /// Number of depth attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Make every further query fail with `SourceError::Disposed`
    pub fn dispose(&self) {
        debug!("Disposing in-memory interval source");
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl IntervalSource for MemoryIntervalSource {
    fn start_time(&self) -> i64 {
        self.start_time
    }

    fn end_time(&self) -> i64 {
        self.end_time
    }

    fn query(
        &self,
        handle: DepthHandle,
        start: i64,
        end: i64,
    ) -> Result<Vec<StateInterval>, SourceError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SourceError::Disposed);
        }
        let intervals = self
            .attributes
            .get(handle)
            .ok_or(SourceError::UnknownAttribute(handle))?;

        Ok(intervals
            .iter()
            .filter(|iv| iv.overlaps(start, end))
            .cloned()
            .collect())
    }
}

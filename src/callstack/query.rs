//! Call stack queries over an interval source.
//!
//! A [`CallStack`] is the per-leaf-element view of the interval source: one
//! depth attribute per stack level, plus time-varying lookups for the symbol
//! key (process) and thread that stamp identity onto every call it returns.

use super::called_function::CalledFunction;
use super::source::{DepthHandle, IntervalSource};
use crate::model::HostModel;
use crate::utils::config::{DEFAULT_HOST_ID, DEFAULT_RESOLUTION, DEFAULT_SYMBOL_KEY, UNKNOWN_TID};
use crate::utils::error::QueryError;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Time-varying symbol key (usually the process ID) of a call stack
pub trait SymbolKeyProvider: Send + Sync {
    fn symbol_key_at(&self, time: i64) -> i32;
}

/// Time-varying thread ID of a call stack
pub trait ThreadIdProvider: Send + Sync {
    fn thread_id_at(&self, time: i64) -> i32;
}

impl<F> SymbolKeyProvider for F
where
    F: Fn(i64) -> i32 + Send + Sync,
{
    fn symbol_key_at(&self, time: i64) -> i32 {
        self(time)
    }
}

impl<F> ThreadIdProvider for F
where
    F: Fn(i64) -> i32 + Send + Sync,
{
    fn thread_id_at(&self, time: i64) -> i32 {
        self(time)
    }
}

/// Query surface for the call stack of one leaf element
#[derive(Clone)]
pub struct CallStack {
    source: Arc<dyn IntervalSource>,
    depth_handles: Vec<DepthHandle>,
    symbol_key: Option<Arc<dyn SymbolKeyProvider>>,
    thread_id: Option<Arc<dyn ThreadIdProvider>>,
    host_id: String,
}

impl CallStack {
    /// Create a call stack whose depth `d` is stored under `depth_handles[d - 1]`
    pub fn new(source: Arc<dyn IntervalSource>, depth_handles: Vec<DepthHandle>) -> Self {
        Self {
            source,
            depth_handles,
            symbol_key: None,
            thread_id: None,
            host_id: DEFAULT_HOST_ID.to_string(),
        }
    }

    pub fn with_symbol_key(mut self, provider: Arc<dyn SymbolKeyProvider>) -> Self {
        self.symbol_key = Some(provider);
        self
    }

    pub fn with_thread_id(mut self, provider: Arc<dyn ThreadIdProvider>) -> Self {
        self.thread_id = Some(provider);
        self
    }

    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.depth_handles.len() as u32
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn start_time(&self) -> i64 {
        self.source.start_time()
    }

    pub fn end_time(&self) -> i64 {
        self.source.end_time()
    }

    /// Symbol key at `time`, or `DEFAULT_SYMBOL_KEY` without a lookup
    pub fn symbol_key_at(&self, time: i64) -> i32 {
        self.symbol_key
            .as_ref()
            .map_or(DEFAULT_SYMBOL_KEY, |provider| provider.symbol_key_at(time))
    }

    /// Thread running this call stack at `time`, or `UNKNOWN_TID`
    pub fn thread_id_at(&self, time: i64) -> i32 {
        self.thread_id
            .as_ref()
            .map_or(UNKNOWN_TID, |provider| provider.thread_id_at(time))
    }

    fn handle(&self, depth: u32) -> Result<DepthHandle, QueryError> {
        if depth == 0 || depth > self.max_depth() {
            return Err(QueryError::InvalidDepth {
                depth,
                max_depth: self.max_depth(),
            });
        }
        Ok(self.depth_handles[(depth - 1) as usize])
    }

    /// List the calls at `depth` overlapping `[start, end)`
    ///
    /// **Public** - range query used by views and tests
    ///
    /// # Arguments
    /// * `depth` - Stack level, in `[1, max_depth]`
    /// * `start`, `end` - Requested range, clipped to the source's range
    /// * `resolution` - Performance hint; only the exact path (1) is
    ///   implemented and larger values return the same result
    /// * `model` - Host model used to resolve CPU times
    ///
    /// # Errors
    /// * `QueryError::InvalidDepth` - depth outside `[1, max_depth]`
    /// * `QueryError::SourceUnavailable` - the source failed
    /// * `QueryError::Function` - an interval carries an unusable value
    pub fn call_list_at_depth(
        &self,
        depth: u32,
        start: i64,
        end: i64,
        resolution: u64,
        model: &dyn HostModel,
    ) -> Result<Vec<CalledFunction>, QueryError> {
        let handle = self.handle(depth)?;
        if resolution > DEFAULT_RESOLUTION {
            debug!("Resolution {} requested, using exact query", resolution);
        }

        let start = start.max(self.start_time());
        let end = end.min(self.end_time());
        if start > end {
            return Ok(Vec::new());
        }

        let intervals = self.source.query(handle, start, end)?;
        let mut calls = Vec::with_capacity(intervals.len());
        for interval in intervals {
            if interval.value.is_none() {
                continue;
            }
            calls.push(CalledFunction::from_state_value(
                interval.start,
                interval.end,
                depth,
                interval.value,
                self.symbol_key_at(interval.start),
                self.thread_id_at(interval.start),
                None,
                model,
            )?);
        }
        Ok(calls)
    }

    /// First call at `depth` starting at or after `time`
    ///
    /// **Public** - main step of the depth-first traversal
    ///
    /// With a `parent`, the call must start strictly within the parent's
    /// span (`start < parent.end()`), which enforces call nesting.
    ///
    /// # Returns
    /// `None` when no further call exists within bounds
    ///
    /// # Errors
    /// * `QueryError::InvalidDepth` - depth outside `[1, max_depth]`
    /// * `QueryError::SourceUnavailable` - the source failed
    /// * `QueryError::Function` - the interval carries an unusable value
    pub fn next_function(
        &self,
        time: i64,
        depth: u32,
        parent: Option<&CalledFunction>,
        model: &dyn HostModel,
    ) -> Result<Option<CalledFunction>, QueryError> {
        let handle = self.handle(depth)?;
        let bound = parent.map_or_else(|| self.end_time(), CalledFunction::end);
        if time >= bound {
            return Ok(None);
        }

        let next = self
            .source
            .query(handle, time, bound)?
            .into_iter()
            .find(|interval| interval.value.is_some() && interval.start >= time);

        match next {
            Some(interval) => Ok(Some(CalledFunction::from_state_value(
                interval.start,
                interval.end,
                depth,
                interval.value,
                self.symbol_key_at(interval.start),
                self.thread_id_at(interval.start),
                parent,
                model,
            )?)),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallStack")
            .field("depth_handles", &self.depth_handles)
            .field("host_id", &self.host_id)
            .finish()
    }
}

/// A leaf element (e.g. one thread) owning one call stack
#[derive(Debug, Clone)]
pub struct CallStackElement {
    name: String,
    parent: Option<String>,
    call_stack: CallStack,
}

impl CallStackElement {
    pub fn new(name: impl Into<String>, call_stack: CallStack) -> Self {
        Self {
            name: name.into(),
            parent: None,
            call_stack,
        }
    }

    /// Name the parent element (e.g. the process owning this thread)
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }
}

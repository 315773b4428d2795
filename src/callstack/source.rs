//! The interval store consumed by call stack queries.
//!
//! An interval source answers time-range queries on a per-depth attribute
//! and returns `(start, end, value)` facts ordered by start time. Ends are
//! exclusive: an interval is active on `[start, end)`. A `None` value means
//! no call was active on that span.

use crate::utils::error::SourceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of one depth attribute inside an interval source
pub type DepthHandle = usize;

/// Raw payload of an interval, as stored by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
}

impl StateValue {
    /// Name of the value's type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            StateValue::Int(_) => "integer",
            StateValue::Long(_) => "long",
            StateValue::Double(_) => "double",
            StateValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Int(v) => write!(f, "{}", v),
            StateValue::Long(v) => write!(f, "{}", v),
            StateValue::Double(v) => write!(f, "{}", v),
            StateValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}

/// One `(start, end, value)` fact from the interval source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInterval {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub value: Option<StateValue>,
}

impl StateInterval {
    pub fn new(start: i64, end: i64, value: Option<StateValue>) -> Self {
        Self { start, end, value }
    }

    /// Whether this interval intersects `[start, end)`
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        if self.start == self.end {
            return self.start >= start && self.start < end;
        }
        self.start < end && self.end > start
    }
}

/// Time-indexed per-depth query service backing call stacks
///
/// Implementations must tolerate concurrent reads: independent call stack
/// elements may be traversed from several threads at once.
pub trait IntervalSource: Send + Sync {
    /// First timestamp known to the source
    fn start_time(&self) -> i64;

    /// Last timestamp known to the source (exclusive)
    fn end_time(&self) -> i64;

    /// Intervals of `handle` intersecting `[start, end)`, ordered by start
    fn query(
        &self,
        handle: DepthHandle,
        start: i64,
        end: i64,
    ) -> Result<Vec<StateInterval>, SourceError>;
}

//! One function invocation read from a call stack.
//!
//! A [`CalledFunction`] is created per query result and consumed right away
//! by the call graph builder. Its self time starts at its duration and is
//! decremented as direct children are attached. CPU time is resolved once,
//! at construction, through the host model.

use super::source::StateValue;
use crate::model::HostModel;
use crate::utils::config::{TIME_UNKNOWN, UNKNOWN_TID};
use crate::utils::error::FunctionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a called function
///
/// Equality is type-sensitive: `Int(1)`, `Long(1)` and `Str("1")` are three
/// different symbols and never merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Symbol {
    Int(i32),
    Long(i64),
    Str(String),
}

impl Symbol {
    /// Parse a raw frame as it appears in folded stacks
    ///
    /// Decimal and `0x`-prefixed hexadecimal frames are addresses and become
    /// `Symbol::Long`; anything else is kept as a string.
    pub fn from_frame(frame: &str) -> Self {
        let frame = frame.trim();
        if let Ok(value) = frame.parse::<i64>() {
            return Symbol::Long(value);
        }
        if let Some(hex) = frame
            .strip_prefix("0x")
            .or_else(|| frame.strip_prefix("0X"))
        {
            if let Ok(value) = i64::from_str_radix(hex, 16) {
                return Symbol::Long(value);
            }
        }
        Symbol::Str(frame.to_string())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Symbol::Int(_) => "integer",
            Symbol::Long(_) => "long",
            Symbol::Str(_) => "string",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Int(v) => write!(f, "{}", v),
            Symbol::Long(v) => write!(f, "{}", v),
            Symbol::Str(v) => f.write_str(v),
        }
    }
}

impl From<i32> for Symbol {
    fn from(value: i32) -> Self {
        Symbol::Int(value)
    }
}

impl From<i64> for Symbol {
    fn from(value: i64) -> Self {
        Symbol::Long(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::Str(value.to_string())
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol::Str(value)
    }
}

impl TryFrom<StateValue> for Symbol {
    type Error = FunctionError;

    fn try_from(value: StateValue) -> Result<Self, Self::Error> {
        match value {
            StateValue::Int(v) => Ok(Symbol::Int(v)),
            StateValue::Long(v) => Ok(Symbol::Long(v)),
            StateValue::Str(v) if !v.is_empty() => Ok(Symbol::Str(v)),
            other => Err(FunctionError::InvalidSymbolType(format!(
                "{} ({})",
                other,
                other.type_name()
            ))),
        }
    }
}

/// Convert an optional interval value into a symbol
///
/// # Errors
/// * `FunctionError::InvalidSymbolType` - absent, floating point or empty value
pub fn symbol_from_value(value: Option<StateValue>) -> Result<Symbol, FunctionError> {
    match value {
        Some(value) => Symbol::try_from(value),
        None => Err(FunctionError::InvalidSymbolType("null".to_string())),
    }
}

/// Informational link from a call to its caller
///
/// Never used for merge identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub symbol: Symbol,
    pub start: i64,
    pub end: i64,
    pub depth: u32,
}

/// One invocation of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalledFunction {
    start: i64,
    end: i64,
    depth: u32,
    symbol: Symbol,
    process_id: i32,
    thread_id: i32,
    parent: Option<ParentRef>,
    self_time: i64,
    cpu_time: i64,
}

impl CalledFunction {
    /// Create a called function spanning `[start, end)`
    ///
    /// CPU time is resolved through `model` when the thread is known and
    /// left at `TIME_UNKNOWN` otherwise.
    ///
    /// # Errors
    /// * `FunctionError::InvalidRange` - `start > end`
    /// * `FunctionError::InvalidSymbolType` - empty string symbol
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: i64,
        end: i64,
        depth: u32,
        symbol: impl Into<Symbol>,
        process_id: i32,
        thread_id: i32,
        parent: Option<&CalledFunction>,
        model: &dyn HostModel,
    ) -> Result<Self, FunctionError> {
        if start > end {
            return Err(FunctionError::InvalidRange { start, end });
        }
        let symbol = symbol.into();
        if matches!(&symbol, Symbol::Str(s) if s.is_empty()) {
            return Err(FunctionError::InvalidSymbolType("empty string".to_string()));
        }

        let duration = end - start;
        let cpu_time = resolve_cpu_time(model, thread_id, start, end, duration);

        Ok(Self {
            start,
            end,
            depth,
            symbol,
            process_id,
            thread_id,
            parent: parent.map(CalledFunction::as_parent_ref),
            self_time: duration,
            cpu_time,
        })
    }

    /// Create a called function from a raw interval value
    ///
    /// # Errors
    /// * `FunctionError::InvalidRange` - `start > end`
    /// * `FunctionError::InvalidSymbolType` - absent, floating point or empty value
    #[allow(clippy::too_many_arguments)]
    pub fn from_state_value(
        start: i64,
        end: i64,
        depth: u32,
        value: Option<StateValue>,
        process_id: i32,
        thread_id: i32,
        parent: Option<&CalledFunction>,
        model: &dyn HostModel,
    ) -> Result<Self, FunctionError> {
        if start > end {
            return Err(FunctionError::InvalidRange { start, end });
        }
        let symbol = symbol_from_value(value)?;
        Self::new(start, end, depth, symbol, process_id, thread_id, parent, model)
    }

    fn as_parent_ref(&self) -> ParentRef {
        ParentRef {
            symbol: self.symbol.clone(),
            start: self.start,
            end: self.end,
            depth: self.depth,
        }
    }

    /// Attach a direct child, removing its duration from this self time
    ///
    /// # Errors
    /// * `FunctionError::NegativeSelfTime` - children overflow this span;
    ///   the self time is left unchanged
    pub fn add_child(&mut self, child: &CalledFunction) -> Result<(), FunctionError> {
        let self_time = self.self_time - child.duration();
        if self_time < 0 {
            return Err(FunctionError::NegativeSelfTime {
                symbol: self.symbol.to_string(),
                self_time,
            });
        }
        self.self_time = self_time;
        Ok(())
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    pub fn thread_id(&self) -> i32 {
        self.thread_id
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    pub fn self_time(&self) -> i64 {
        self.self_time
    }

    /// Resolved CPU time, or `TIME_UNKNOWN`
    pub fn cpu_time(&self) -> i64 {
        self.cpu_time
    }

    pub fn has_cpu_time(&self) -> bool {
        self.cpu_time != TIME_UNKNOWN
    }
}

impl fmt::Display for CalledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] Duration: {}, Self Time: {}, Symbol: {}",
            self.start, self.end, self.duration(), self.self_time, self.symbol
        )
    }
}

fn resolve_cpu_time(model: &dyn HostModel, tid: i32, start: i64, end: i64, duration: i64) -> i64 {
    if tid == UNKNOWN_TID {
        return TIME_UNKNOWN;
    }
    match model.cpu_time(tid, start, end) {
        TIME_UNKNOWN => TIME_UNKNOWN,
        cpu_time => cpu_time.clamp(0, duration),
    }
}

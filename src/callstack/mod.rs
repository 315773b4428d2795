//! Call stacks read from an interval source.
//!
//! This module handles:
//! - The interval source seam (`source`) and an in-memory store (`memory`)
//! - Called function values and symbols (`called_function`)
//! - Per-leaf-element call stack queries (`query`)

pub mod called_function;
pub mod memory;
pub mod query;
pub mod source;

// Re-export main types
pub use called_function::{symbol_from_value, CalledFunction, ParentRef, Symbol};
pub use memory::MemoryIntervalSource;
pub use query::{CallStack, CallStackElement, SymbolKeyProvider, ThreadIdProvider};
pub use source::{DepthHandle, IntervalSource, StateInterval, StateValue};

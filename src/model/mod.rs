//! Host models: pluggable sources of CPU-time and thread-on-CPU facts.
//!
//! - `host` - provider traits and the composite first-responder model
//! - `registry` - explicitly owned per-host registry

pub mod host;
pub mod registry;

// Re-export main types
pub use host::{CompositeHostModel, CpuTimeProvider, HostModel, ProviderId, ThreadOnCpuProvider};
pub use registry::ModelRegistry;

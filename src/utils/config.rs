//! Configuration and constants shared by the library and the CLI.

/// Sentinel for a CPU time no provider could resolve
pub const TIME_UNKNOWN: i64 = -1;

/// Sentinel for a thread ID no provider could resolve
pub const UNKNOWN_TID: i32 = -1;

/// Symbol key used when a call stack has no symbol-key lookup
pub const DEFAULT_SYMBOL_KEY: i32 = -1;

/// Query resolution that returns every interval (exact path)
pub const DEFAULT_RESOLUTION: u64 = 1;

/// Host used when a call stack does not name one
pub const DEFAULT_HOST_ID: &str = "localhost";

/// Name of the group produced by the "all elements" aggregation
pub const ALL_GROUP_NAME: &str = "all";

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default number of hot paths included in reports
pub const DEFAULT_TOP_PATHS: usize = 20;

/// Separator between frames in folded stack lines
pub const FOLDED_FRAME_SEPARATOR: char = ';';

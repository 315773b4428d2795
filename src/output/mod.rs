//! Output writers for call graph reports.
//!
//! This module handles:
//! - The versioned report schema (`schema`)
//! - JSON reports (`json`)
//! - Text trees and hot path tables (`text`)

pub mod json;
pub mod schema;
pub mod text;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report};
pub use schema::{CallGraphReport, CallSiteSummary, GroupSummary, MetricStatistics};
pub use text::{generate_text_summary, render_tree};

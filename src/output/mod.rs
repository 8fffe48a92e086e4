//! Output module for reporting harvest results
//!
//! This module handles:
//! - Computing statistics over the raw log and canonical table
//! - Printing them for `--stats` and logging them after a run
//! - Exporting both tables as CSV files

pub mod csv;
pub mod stats;

pub use self::csv::{export_csv, neutralize_formula, ExportSummary, CLEAN_FILE, RAW_FILE};
pub use stats::{load_statistics, log_statistics, print_statistics, RunStatistics};

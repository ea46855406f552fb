//! `go test -json` analysis
//!
//! This module turns the event stream printed by `go test -json` into:
//! - Live per-package and per-test progress lines
//! - Benchmark measurements reassembled from split output fragments
//! - A per-package summary table with run totals

pub mod analyzer;
pub mod benchmark;
pub mod driver;
pub mod event;
pub mod reporter;
pub mod results;
pub mod summary;

pub use analyzer::{AnalyzerOptions, TestMode};
pub use driver::Analyzer;
pub use reporter::ConsoleReporter;

//! End-of-run test summary
//!
//! Built from the aggregation store once the event stream closes cleanly and
//! rendered as an aligned table plus a grand-total line.

use std::collections::BTreeMap;
use std::time::Duration;

use super::results::{PackageAggregate, TestStatus};
use crate::utils::terminal::format_duration;

/// Column padding between table cells
const CELL_PADDING: usize = 3;

/// One table row per package
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Package name relative to the module root
    pub package: String,
    pub status: TestStatus,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Aggregated totals over every package of a run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestSummary {
    pub rows: Vec<SummaryRow>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

impl TestSummary {
    /// Walk the aggregation store and accumulate totals
    pub fn from_packages(packages: &BTreeMap<String, PackageAggregate>, module_root: &str) -> Self {
        let mut summary = Self::default();

        for (name, pkg) in packages {
            summary.passed += pkg.passed;
            summary.failed += pkg.failed;
            summary.skipped += pkg.skipped;
            summary.elapsed += pkg.elapsed;
            summary.rows.push(SummaryRow {
                package: display_package_name(name, module_root),
                status: pkg.status,
                passed: pkg.passed,
                failed: pkg.failed,
                skipped: pkg.skipped,
                elapsed: pkg.elapsed,
            });
        }

        summary
    }

    /// Whether any package failed or did not build
    pub fn has_failures(&self) -> bool {
        self.failed > 0
            || self
                .rows
                .iter()
                .any(|row| matches!(row.status, TestStatus::Fail | TestStatus::BuildFail))
    }

    /// Render the package table
    pub fn render_table(&self) -> String {
        let mut table: Vec<[String; 6]> = vec![[
            "PACKAGE".to_string(),
            "STATUS".to_string(),
            "PASSED".to_string(),
            "FAILED".to_string(),
            "SKIPPED".to_string(),
            "ELAPSED".to_string(),
        ]];
        for row in &self.rows {
            table.push([
                row.package.clone(),
                row.status.to_string(),
                row.passed.to_string(),
                row.failed.to_string(),
                row.skipped.to_string(),
                format_duration(row.elapsed),
            ]);
        }

        let mut widths = [0usize; 6];
        for cells in &table {
            for (width, cell) in widths.iter_mut().zip(cells.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for cells in &table {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                if i + 1 == cells.len() {
                    line.push_str(cell);
                } else {
                    line.push_str(&format!("{:<width$}", cell, width = widths[i] + CELL_PADDING));
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// Render the grand-total line
    pub fn render_total(&self) -> String {
        format!(
            "test result: {} passed, {} failed, {} skipped, finished in {}",
            self.passed,
            self.failed,
            self.skipped,
            format_duration(self.elapsed)
        )
    }
}

/// Shorten a package import path relative to the module root
pub fn display_package_name(package: &str, module_root: &str) -> String {
    match package.strip_prefix(module_root) {
        Some("") => ".".to_string(),
        // Only strip on a path segment boundary.
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => package.to_string(),
    }
}

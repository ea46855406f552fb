//! Per-package test result aggregation
//!
//! Records are built incrementally from the event stream. A package owns its
//! unit test and benchmark records for the lifetime of one analysis run.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestStatus {
    /// No terminal event seen yet
    #[default]
    Unknown,
    Pass,
    Skip,
    Fail,
    /// The test binary itself failed to build
    BuildFail,
}

impl TestStatus {
    /// Whether the status can no longer change
    pub fn is_terminal(self) -> bool {
        self != TestStatus::Unknown
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Unknown => write!(f, "UNKNOWN"),
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Skip => write!(f, "SKIPPED"),
            TestStatus::Fail => write!(f, "FAILED"),
            TestStatus::BuildFail => write!(f, "BUILD FAILED"),
        }
    }
}

/// Individual unit test result
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTestRecord {
    pub name: String,
    /// Time of the `run` event
    pub started_at: Option<DateTime<Utc>>,
    pub status: TestStatus,
    pub elapsed: Duration,
}

impl UnitTestRecord {
    /// Create a running test record
    pub fn running(name: &str, started_at: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.to_string(),
            started_at,
            status: TestStatus::Unknown,
            elapsed: Duration::ZERO,
        }
    }
}

/// A single parsed benchmark result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BenchmarkRecord {
    /// Benchmark name including the concurrency suffix
    pub name: String,
    pub iterations: u64,
    /// Time per operation (nanoseconds)
    pub ns_per_op: f64,
    pub bytes_per_op: u64,
    pub allocs_per_op: u64,
}

impl BenchmarkRecord {
    /// Format time per operation with an appropriate unit
    pub fn format_time(&self) -> String {
        if self.ns_per_op >= 1_000_000_000.0 {
            format!("{:.2}s", self.ns_per_op / 1_000_000_000.0)
        } else if self.ns_per_op >= 1_000_000.0 {
            format!("{:.2}ms", self.ns_per_op / 1_000_000.0)
        } else if self.ns_per_op >= 1_000.0 {
            format!("{:.2}µs", self.ns_per_op / 1_000.0)
        } else {
            format!("{}ns", self.ns_per_op)
        }
    }
}

/// Aggregated results of one package
#[derive(Debug, Clone, PartialEq)]
pub struct PackageAggregate {
    pub name: String,
    pub status: TestStatus,
    pub elapsed: Duration,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unit_tests: BTreeMap<String, UnitTestRecord>,
    pub benchmarks: BTreeMap<String, BenchmarkRecord>,
}

impl PackageAggregate {
    /// Create an aggregate for a package that just started
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Unknown,
            elapsed: Duration::ZERO,
            passed: 0,
            failed: 0,
            skipped: 0,
            unit_tests: BTreeMap::new(),
            benchmarks: BTreeMap::new(),
        }
    }

    /// Apply a terminal status to a running unit test
    ///
    /// Returns the updated record, or `None` when the test is unknown or has
    /// already finished.
    pub fn finish_test(
        &mut self,
        test: &str,
        status: TestStatus,
        elapsed: Duration,
    ) -> Option<&UnitTestRecord> {
        let record = self.unit_tests.get_mut(test)?;
        if record.status.is_terminal() {
            return None;
        }

        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::Skip => self.skipped += 1,
            TestStatus::Unknown | TestStatus::BuildFail => {}
        }
        record.status = status;
        record.elapsed = elapsed;
        Some(record)
    }

    /// Apply the package-level terminal status
    ///
    /// A skipped package (no test files or every test skipped) counts as
    /// passed. Returns `false` if the package had already finished.
    pub fn finish(&mut self, status: TestStatus, build_failed: bool, elapsed: Duration) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = match status {
            TestStatus::Skip => TestStatus::Pass,
            TestStatus::Fail if build_failed => TestStatus::BuildFail,
            other => other,
        };
        self.elapsed = elapsed;
        true
    }

    /// Record a completed benchmark, which counts as a passed test
    ///
    /// When the benchmark function `run` also has a unit test record it is
    /// settled as passed without being counted a second time.
    pub fn add_benchmark(&mut self, run: &str, bench: BenchmarkRecord) {
        self.passed += 1;
        if let Some(record) = self.unit_tests.get_mut(run) {
            if !record.status.is_terminal() {
                record.status = TestStatus::Pass;
            }
        }
        self.benchmarks.insert(bench.name.clone(), bench);
    }
}

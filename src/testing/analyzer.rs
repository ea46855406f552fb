//! Test event aggregation and dispatch
//!
//! [`AnalyzerState`] is the single writer of the aggregation store. Events are
//! applied one at a time in stream order; every event except output from the
//! build itself must name a package whose `start` event was already seen.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::benchmark::{BenchFeed, BenchReassembler};
use super::event::{decode_line, Action, Decoded, TestEvent};
use super::reporter::TestReporter;
use super::results::{PackageAggregate, TestStatus, UnitTestRecord};
use super::summary::TestSummary;
use crate::error::AnalyzerError;

/// Output prefixes printed by the test framework itself
const NOISE_PREFIXES: &[&str] = &[
    "=== RUN",
    "=== PAUSE",
    "=== CONT",
    "=== NAME",
    "--- PASS:",
    "--- FAIL:",
    "--- SKIP:",
    "PASS",
    "FAIL\n",
    "?   \t",
    "ok  \t",
];

/// Which kinds of tests a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestMode {
    #[default]
    UnitTests,
    Benchmarks,
    UnitTestsAndBenchmarks,
}

impl TestMode {
    pub fn from_flags(bench: bool, with_tests: bool) -> Self {
        match (bench, with_tests) {
            (false, _) => TestMode::UnitTests,
            (true, false) => TestMode::Benchmarks,
            (true, true) => TestMode::UnitTestsAndBenchmarks,
        }
    }

    pub fn runs_unit_tests(self) -> bool {
        matches!(self, TestMode::UnitTests | TestMode::UnitTestsAndBenchmarks)
    }

    pub fn runs_benchmarks(self) -> bool {
        matches!(self, TestMode::Benchmarks | TestMode::UnitTestsAndBenchmarks)
    }
}

/// Options handed to the analyzer by the command layer
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    /// Forward test output to the reporter
    pub verbose: bool,
    pub mode: TestMode,
    /// Concurrency counts benchmark names are suffixed with
    pub cpus: Vec<String>,
    /// Module path used to shorten package names
    pub module_root: String,
}

impl AnalyzerOptions {
    pub fn new(module_root: impl Into<String>) -> Self {
        Self {
            verbose: false,
            mode: TestMode::default(),
            cpus: Vec::new(),
            module_root: module_root.into(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn mode(mut self, mode: TestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn cpus(mut self, cpus: Vec<String>) -> Self {
        self.cpus = cpus;
        self
    }
}

/// Final result of a cleanly finished analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub packages: BTreeMap<String, PackageAggregate>,
    pub summary: TestSummary,
}

/// Aggregation store plus the cursors needed to interpret the stream
#[derive(Debug)]
pub struct AnalyzerState {
    options: AnalyzerOptions,
    packages: BTreeMap<String, PackageAggregate>,
    bench: BenchReassembler,
    /// Most recently started test, used to recognize benchmark result lines
    last_test: String,
}

impl AnalyzerState {
    pub fn new(mut options: AnalyzerOptions) -> Self {
        if options.cpus.is_empty() {
            let gomaxprocs = std::env::var("GOMAXPROCS").ok();
            options.cpus = default_cpus(gomaxprocs.as_deref());
        }
        Self {
            options,
            packages: BTreeMap::new(),
            bench: BenchReassembler::new(),
            last_test: String::new(),
        }
    }

    #[cfg(test)]
    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn packages(&self) -> &BTreeMap<String, PackageAggregate> {
        &self.packages
    }

    /// Decode and apply one raw line of the stream
    pub fn handle_line(
        &mut self,
        line: &str,
        reporter: &mut dyn TestReporter,
    ) -> Result<(), AnalyzerError> {
        match decode_line(line)? {
            Decoded::Event(event) => self.dispatch(&event, reporter),
            Decoded::Diagnostic(text) => {
                reporter.diagnostic(&text);
                Ok(())
            }
            Decoded::Blank => Ok(()),
        }
    }

    /// Apply one decoded event
    pub fn dispatch(
        &mut self,
        event: &TestEvent,
        reporter: &mut dyn TestReporter,
    ) -> Result<(), AnalyzerError> {
        match &event.action {
            Action::Start => {
                self.start_package(event, reporter);
                Ok(())
            }
            Action::Run => self.run_test(event, reporter),
            Action::Output | Action::BuildOutput => self.handle_output(event, reporter),
            Action::Pass => self.finish(event, TestStatus::Pass, reporter),
            Action::Fail => self.finish(event, TestStatus::Fail, reporter),
            Action::Skip => self.finish(event, TestStatus::Skip, reporter),
            Action::Pause | Action::Cont | Action::Bench => {
                lookup(&mut self.packages, event)?;
                trace!(action = %event.action, package = %event.package, test = ?event.test_name(), "no state change");
                Ok(())
            }
            Action::Unknown(tag) => {
                debug!(action = %tag, package = %event.package, "ignoring unknown test event action");
                Ok(())
            }
        }
    }

    /// Build the summary, hand it to the reporter and release the store
    pub fn finish_run(self, reporter: &mut dyn TestReporter) -> AnalysisReport {
        let summary = TestSummary::from_packages(&self.packages, &self.options.module_root);
        reporter.summary(&summary);
        AnalysisReport {
            packages: self.packages,
            summary,
        }
    }

    fn start_package(&mut self, event: &TestEvent, reporter: &mut dyn TestReporter) {
        if self.packages.contains_key(&event.package) {
            debug!(package = %event.package, "package started twice, keeping existing results");
            return;
        }

        let pkg = PackageAggregate::new(&event.package);
        reporter.package_started(&pkg);
        self.packages.insert(event.package.clone(), pkg);
    }

    fn run_test(&mut self, event: &TestEvent, reporter: &mut dyn TestReporter) -> Result<(), AnalyzerError> {
        let mode = self.options.mode;
        let pkg = lookup(&mut self.packages, event)?;
        let test = event.test_name().unwrap_or_default();

        // a benchmark's result line settles its record, see add_benchmark
        if mode.runs_unit_tests() && !test.is_empty() {
            pkg.unit_tests
                .insert(test.to_string(), UnitTestRecord::running(test, event.time));
        }

        self.last_test = test.to_string();
        reporter.test_running(&event.package, test);
        Ok(())
    }

    fn handle_output(&mut self, event: &TestEvent, reporter: &mut dyn TestReporter) -> Result<(), AnalyzerError> {
        let has_package = !event.package.is_empty();
        if has_package {
            lookup(&mut self.packages, event)?;
        }

        let Some(text) = event.output_text() else {
            return Ok(());
        };
        let benchmarks = self.options.mode.runs_benchmarks();
        if !(self.options.verbose || benchmarks) || is_noise(text) {
            return Ok(());
        }

        let mut echo = true;
        if has_package && benchmarks {
            let feed = self.bench.feed(&self.last_test, &self.options.cpus, text);
            echo = feed.should_echo();
            if let BenchFeed::Complete(Some(bench)) = feed {
                let pkg = lookup(&mut self.packages, event)?;
                reporter.benchmark_finished(&event.package, &bench);
                pkg.add_benchmark(&self.last_test, bench);
            }
        }

        if self.options.verbose && echo {
            reporter.output(text);
        }
        Ok(())
    }

    fn finish(
        &mut self,
        event: &TestEvent,
        status: TestStatus,
        reporter: &mut dyn TestReporter,
    ) -> Result<(), AnalyzerError> {
        let pkg = lookup(&mut self.packages, event)?;

        match event.test_name() {
            Some(test) => match pkg.finish_test(test, status, event.elapsed()) {
                Some(record) => reporter.test_finished(&event.package, record),
                None => debug!(package = %event.package, test, "no running test to finish"),
            },
            None => {
                if pkg.finish(status, event.is_build_failure(), event.elapsed()) {
                    reporter.package_finished(pkg);
                } else {
                    debug!(package = %event.package, "package already finished");
                }
            }
        }
        Ok(())
    }
}

/// The cpu count `go test` runs with when `-cpu` is not given
fn default_cpus(gomaxprocs: Option<&str>) -> Vec<String> {
    let cpus = gomaxprocs
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .or_else(|| std::thread::available_parallelism().map(|n| n.get()).ok())
        .unwrap_or(1);
    vec![cpus.to_string()]
}

fn lookup<'a>(
    packages: &'a mut BTreeMap<String, PackageAggregate>,
    event: &TestEvent,
) -> Result<&'a mut PackageAggregate, AnalyzerError> {
    packages
        .get_mut(&event.package)
        .ok_or_else(|| AnalyzerError::Dispatch {
            action: event.action.clone(),
            package: event.package.clone(),
        })
}

fn is_noise(text: &str) -> bool {
    NOISE_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::testing::reporter::recording::{Notification, RecordingReporter};

    const PKG: &str = "example.com/m/util";

    fn event(action: &str, test: Option<&str>, elapsed: Option<f64>) -> String {
        let mut value = json!({
            "Time": "2024-03-01T10:00:00Z",
            "Action": action,
            "Package": PKG,
        });
        if let Some(test) = test {
            value["Test"] = json!(test);
        }
        if let Some(elapsed) = elapsed {
            value["Elapsed"] = json!(elapsed);
        }
        value.to_string()
    }

    fn output(test: Option<&str>, text: &str) -> String {
        let mut value = json!({ "Action": "output", "Package": PKG, "Output": text });
        if let Some(test) = test {
            value["Test"] = json!(test);
        }
        value.to_string()
    }

    fn feed(state: &mut AnalyzerState, reporter: &mut RecordingReporter, lines: &[String]) -> Result<(), AnalyzerError> {
        for line in lines {
            state.handle_line(line, reporter)?;
        }
        Ok(())
    }

    fn unit_stream() -> Vec<String> {
        vec![
            event("start", None, None),
            event("run", Some("TestA"), None),
            output(Some("TestA"), "=== RUN   TestA\n"),
            output(Some("TestA"), "    util_test.go:12: hello\n"),
            event("pass", Some("TestA"), Some(0.01)),
            event("run", Some("TestB"), None),
            event("fail", Some("TestB"), Some(0.02)),
            event("run", Some("TestC"), None),
            event("skip", Some("TestC"), Some(0.0)),
            event("fail", None, Some(0.5)),
        ]
    }

    #[test]
    fn test_unit_test_counts() {
        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();
        feed(&mut state, &mut reporter, &unit_stream()).unwrap();

        let pkg = &state.packages()[PKG];
        assert_eq!(pkg.status, TestStatus::Fail);
        assert_eq!((pkg.passed, pkg.failed, pkg.skipped), (1, 1, 1));
        assert_eq!(pkg.elapsed, Duration::from_millis(500));
        assert_eq!(pkg.unit_tests["TestA"].status, TestStatus::Pass);
        assert_eq!(pkg.unit_tests["TestA"].elapsed, Duration::from_millis(10));
        assert!(pkg.unit_tests["TestA"].started_at.is_some());
        assert_eq!(pkg.unit_tests["TestC"].status, TestStatus::Skip);

        let notifications = reporter.take();
        assert_eq!(notifications[0], Notification::PackageStarted(PKG.to_string()));
        assert_eq!(
            notifications[1],
            Notification::TestRunning(PKG.to_string(), "TestA".to_string())
        );
        // output is not forwarded without verbose
        assert!(!notifications
            .iter()
            .any(|n| matches!(n, Notification::Output(_))));
        assert_eq!(
            notifications.last(),
            Some(&Notification::PackageFinished(PKG.to_string(), TestStatus::Fail))
        );
    }

    #[test]
    fn test_verbose_output_drops_framework_noise() {
        let options = AnalyzerOptions::new("example.com/m").verbose(true);
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        feed(&mut state, &mut reporter, &unit_stream()).unwrap();

        let outputs: Vec<Notification> = reporter
            .take()
            .into_iter()
            .filter(|n| matches!(n, Notification::Output(_)))
            .collect();
        assert_eq!(
            outputs,
            vec![Notification::Output("    util_test.go:12: hello\n".to_string())]
        );
    }

    #[test]
    fn test_event_before_start_is_dispatch_error() {
        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();

        let err = state
            .handle_line(&event("run", Some("TestA"), None), &mut reporter)
            .unwrap_err();
        match err {
            AnalyzerError::Dispatch { action, package } => {
                assert_eq!(action, Action::Run);
                assert_eq!(package, PKG);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(reporter.take().is_empty());
    }

    #[test]
    fn test_every_action_requires_started_package() {
        for action in ["run", "pause", "cont", "pass", "fail", "skip", "output", "bench"] {
            let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
            let mut reporter = RecordingReporter::new();
            let result = state.handle_line(&event(action, Some("TestA"), None), &mut reporter);
            assert!(
                matches!(result, Err(AnalyzerError::Dispatch { .. })),
                "{} should require a started package",
                action
            );
        }
    }

    #[test]
    fn test_package_skip_without_tests_is_pass() {
        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();
        feed(
            &mut state,
            &mut reporter,
            &[event("start", None, None), event("skip", None, Some(0.01))],
        )
        .unwrap();

        let report = state.finish_run(&mut reporter);
        let row = &report.summary.rows[0];
        assert_eq!(row.package, "util");
        assert_eq!(row.status, TestStatus::Pass);
        assert_eq!((row.passed, row.failed, row.skipped), (0, 0, 0));
        assert_eq!(row.elapsed, Duration::from_millis(10));
    }

    #[test]
    fn test_build_failure_is_distinct_status() {
        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();
        let fail = json!({
            "Action": "fail",
            "Package": PKG,
            "Elapsed": 0.0,
            "FailedBuild": "example.com/m/util [example.com/m/util.test]",
        })
        .to_string();
        feed(&mut state, &mut reporter, &[event("start", None, None), fail]).unwrap();

        let pkg = &state.packages()[PKG];
        assert_eq!(pkg.status, TestStatus::BuildFail);
        assert_ne!(pkg.status, TestStatus::Fail);
        assert_eq!((pkg.passed, pkg.failed, pkg.skipped), (0, 0, 0));
    }

    #[test]
    fn test_replay_yields_identical_store() {
        let lines = unit_stream();

        let mut first = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        feed(&mut first, &mut RecordingReporter::new(), &lines).unwrap();
        let mut second = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        feed(&mut second, &mut RecordingReporter::new(), &lines).unwrap();

        assert_eq!(first.packages(), second.packages());
    }

    #[test]
    fn test_counts_never_exceed_run_events() {
        let lines = unit_stream();
        let runs = lines.iter().filter(|l| l.contains("\"run\"")).count();

        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();
        let mut extra = lines.clone();
        // a duplicate terminal event must not be counted twice
        extra.insert(5, event("pass", Some("TestA"), Some(0.01)));
        feed(&mut state, &mut reporter, &extra).unwrap();

        let pkg = &state.packages()[PKG];
        assert!(pkg.passed + pkg.failed + pkg.skipped <= runs);
        assert_eq!(pkg.passed, 1);
    }

    #[test]
    fn test_split_benchmark_result() {
        let options = AnalyzerOptions::new("example.com/m")
            .mode(TestMode::Benchmarks)
            .cpus(vec!["4".to_string()]);
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        feed(
            &mut state,
            &mut reporter,
            &[
                event("start", None, None),
                event("run", Some("BenchName"), None),
                output(Some("BenchName"), "BenchName-4 \t"),
                output(Some("BenchName"), "  1290205\t 933.7 ns/op\n"),
                event("pass", Some("BenchName"), Some(1.2)),
                output(None, "PASS\n"),
                event("pass", None, Some(1.5)),
            ],
        )
        .unwrap();

        let pkg = &state.packages()[PKG];
        assert_eq!(pkg.passed, 1);
        assert!(pkg.unit_tests.is_empty());
        let bench = &pkg.benchmarks["BenchName-4"];
        assert_eq!(bench.iterations, 1290205);
        assert!((bench.ns_per_op - 933.7).abs() < 1e-9);

        let notifications = reporter.take();
        assert!(notifications.contains(&Notification::BenchmarkFinished(
            PKG.to_string(),
            "BenchName-4".to_string()
        )));
    }

    #[test]
    fn test_benchmarks_with_unit_tests_count_once() {
        let options = AnalyzerOptions::new("example.com/m")
            .mode(TestMode::UnitTestsAndBenchmarks)
            .cpus(vec!["2".to_string()]);
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        feed(
            &mut state,
            &mut reporter,
            &[
                event("start", None, None),
                event("run", Some("TestA"), None),
                event("pass", Some("TestA"), Some(0.0)),
                event("run", Some("BenchmarkB"), None),
                output(Some("BenchmarkB"), "BenchmarkB-2 \t 100\t 12.5 ns/op\t 8 B/op\t 1 allocs/op\n"),
                event("pass", Some("BenchmarkB"), Some(1.0)),
                event("pass", None, Some(1.1)),
            ],
        )
        .unwrap();

        let pkg = &state.packages()[PKG];
        assert_eq!(pkg.passed, 2);
        assert_eq!(pkg.unit_tests.len(), 2);
        assert_eq!(pkg.unit_tests["BenchmarkB"].status, TestStatus::Pass);
        assert_eq!(pkg.benchmarks["BenchmarkB-2"].allocs_per_op, 1);
    }

    #[test]
    fn test_failing_benchmark_with_unit_tests_counts_as_failed() {
        let options = AnalyzerOptions::new("example.com/m")
            .mode(TestMode::UnitTestsAndBenchmarks)
            .cpus(vec!["2".to_string()]);
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        feed(
            &mut state,
            &mut reporter,
            &[
                event("start", None, None),
                event("run", Some("BenchmarkX"), None),
                output(Some("BenchmarkX"), "    bench_test.go:9: setup failed\n"),
                event("fail", Some("BenchmarkX"), Some(0.0)),
                event("fail", None, Some(0.2)),
            ],
        )
        .unwrap();

        let report = state.finish_run(&mut reporter);
        let pkg = &report.packages[PKG];
        assert_eq!(pkg.status, TestStatus::Fail);
        assert_eq!((pkg.passed, pkg.failed, pkg.skipped), (0, 1, 0));
        assert_eq!(report.summary.failed, 1);
        assert!(reporter.take().contains(&Notification::TestFinished(
            PKG.to_string(),
            "BenchmarkX".to_string(),
            TestStatus::Fail
        )));
    }

    #[test]
    fn test_verbose_benchmark_text_is_not_echoed() {
        let options = AnalyzerOptions::new("example.com/m")
            .verbose(true)
            .mode(TestMode::Benchmarks)
            .cpus(vec!["4".to_string()]);
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        feed(
            &mut state,
            &mut reporter,
            &[
                event("start", None, None),
                output(None, "goos: linux\n"),
                event("run", Some("BenchmarkX"), None),
                output(Some("BenchmarkX"), "BenchmarkX-4 \t"),
                output(Some("BenchmarkX"), " 10\t 5 ns/op\n"),
            ],
        )
        .unwrap();

        let outputs: Vec<Notification> = reporter
            .take()
            .into_iter()
            .filter(|n| matches!(n, Notification::Output(_)))
            .collect();
        assert_eq!(outputs, vec![Notification::Output("goos: linux\n".to_string())]);
    }

    #[test]
    fn test_build_output_without_package_is_display_only() {
        let options = AnalyzerOptions::new("example.com/m").verbose(true);
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        let line = json!({
            "ImportPath": "example.com/m/broken",
            "Action": "build-output",
            "Output": "./broken.go:3:1: syntax error\n",
        })
        .to_string();

        state.handle_line(&line, &mut reporter).unwrap();
        assert_eq!(
            reporter.take(),
            vec![Notification::Output("./broken.go:3:1: syntax error\n".to_string())]
        );
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();
        let line = json!({ "Action": "build-fail", "ImportPath": "example.com/m/broken" }).to_string();

        state.handle_line(&line, &mut reporter).unwrap();
        assert!(state.packages().is_empty());
        assert!(reporter.take().is_empty());
    }

    #[test]
    fn test_diagnostic_line_is_forwarded() {
        let mut state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        let mut reporter = RecordingReporter::new();
        state
            .handle_line("warning: ignoring symlink /work/link", &mut reporter)
            .unwrap();
        assert_eq!(
            reporter.take(),
            vec![Notification::Diagnostic("warning: ignoring symlink /work/link".to_string())]
        );
    }

    #[test]
    fn test_default_cpus_from_parallelism() {
        let state = AnalyzerState::new(AnalyzerOptions::new("example.com/m"));
        assert_eq!(state.options().cpus.len(), 1);
        assert!(state.options().cpus[0].parse::<usize>().unwrap() >= 1);
    }

    #[test]
    fn test_default_cpus_prefer_gomaxprocs() {
        assert_eq!(default_cpus(Some("3")), vec!["3".to_string()]);
        for invalid in [None, Some("0"), Some("-2"), Some("many")] {
            let cpus = default_cpus(invalid);
            assert_eq!(cpus.len(), 1);
            assert!(cpus[0].parse::<usize>().unwrap() >= 1);
        }
    }

    #[test]
    fn test_benchmark_suffix_from_gomaxprocs() {
        let options = AnalyzerOptions::new("example.com/m")
            .mode(TestMode::Benchmarks)
            .cpus(default_cpus(Some("3")));
        let mut state = AnalyzerState::new(options);
        let mut reporter = RecordingReporter::new();
        feed(
            &mut state,
            &mut reporter,
            &[
                event("start", None, None),
                event("run", Some("BenchmarkX"), None),
                output(Some("BenchmarkX"), "BenchmarkX-3 \t 10\t 5 ns/op\n"),
            ],
        )
        .unwrap();

        let pkg = &state.packages()[PKG];
        assert_eq!(pkg.benchmarks.len(), 1);
        assert_eq!(pkg.benchmarks["BenchmarkX-3"].iterations, 10);
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(TestMode::from_flags(false, true), TestMode::UnitTests);
        assert_eq!(TestMode::from_flags(true, false), TestMode::Benchmarks);
        assert!(TestMode::from_flags(true, true).runs_unit_tests());
        assert!(!TestMode::Benchmarks.runs_unit_tests());
    }
}

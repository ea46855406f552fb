//! Live progress notifications
//!
//! The analyzer reports what it reconstructs through [`TestReporter`]. The
//! console implementation prints cargo-style status lines and keeps a spinner
//! with the currently running test on interactive terminals.

use std::io::{self, Write};

use console::{style, StyledObject, Term};
use indicatif::ProgressBar;

use super::results::{BenchmarkRecord, PackageAggregate, TestStatus, UnitTestRecord};
use super::summary::{display_package_name, TestSummary};
use crate::utils::terminal::{create_spinner, format_duration};

/// Receiver of analyzer notifications
pub trait TestReporter: Send {
    fn package_started(&mut self, package: &PackageAggregate);
    fn test_running(&mut self, package: &str, test: &str);
    fn test_finished(&mut self, package: &str, test: &UnitTestRecord);
    fn benchmark_finished(&mut self, package: &str, bench: &BenchmarkRecord);
    fn package_finished(&mut self, package: &PackageAggregate);
    /// Raw test output forwarded in verbose mode
    fn output(&mut self, text: &str);
    /// A known non-event line from the go tool
    fn diagnostic(&mut self, line: &str);
    fn summary(&mut self, summary: &TestSummary);
}

/// Prints notifications to a terminal or any writer
pub struct ConsoleReporter<W = io::Stdout> {
    out: W,
    module_root: String,
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter<io::Stdout> {
    /// Reporter on stdout, with a spinner when stdout is a terminal
    pub fn stdout(module_root: &str) -> Self {
        let spinner = Term::stdout()
            .is_term()
            .then(|| create_spinner("waiting for test output"));
        Self {
            out: io::stdout(),
            module_root: module_root.to_string(),
            spinner,
        }
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Reporter on an arbitrary writer, without a spinner
    #[cfg(test)]
    pub fn with_writer(out: W, module_root: &str) -> Self {
        Self {
            out,
            module_root: module_root.to_string(),
            spinner: None,
        }
    }

    #[cfg(test)]
    pub fn into_inner(mut self) -> W
    where
        W: Default,
    {
        std::mem::take(&mut self.out)
    }

    fn package_name(&self, package: &str) -> String {
        display_package_name(package, &self.module_root)
    }

    /// `pkg.Test` name, or just the test for the module root package
    fn qualified_name(&self, package: &str, name: &str) -> String {
        match self.package_name(package).as_str() {
            "." => name.to_string(),
            prefix => format!("{}.{}", prefix, name),
        }
    }

    // Write errors are not fatal to the analysis; stdout may be a closed pipe.
    fn emit(&mut self, write: impl FnOnce(&mut W) -> io::Result<()>) {
        let out = &mut self.out;
        let _ = match &self.spinner {
            Some(spinner) => spinner.suspend(|| write(out)),
            None => write(out),
        };
    }

    fn status_line(&mut self, label: StyledObject<String>, message: String) {
        self.emit(|out| writeln!(out, "{} {}", label, message));
    }
}

fn label(text: &str) -> StyledObject<String> {
    style(format!("{:>12}", text))
}

fn styled_status(status: TestStatus) -> StyledObject<String> {
    let text = style(status.to_string());
    match status {
        TestStatus::Pass => text.green().bold(),
        TestStatus::Fail | TestStatus::BuildFail => text.red(),
        TestStatus::Skip => text.cyan(),
        TestStatus::Unknown => text.yellow(),
    }
}

impl<W: Write + Send> TestReporter for ConsoleReporter<W> {
    fn package_started(&mut self, package: &PackageAggregate) {
        let message = format!("package {}", package.name);
        self.status_line(label("Testing").green().bold(), message);
    }

    fn test_running(&mut self, package: &str, test: &str) {
        let name = self.qualified_name(package, test);
        if let Some(spinner) = &self.spinner {
            spinner.set_message(name.clone());
        }
        self.status_line(label("Running").green().bold(), name);
    }

    fn test_finished(&mut self, package: &str, test: &UnitTestRecord) {
        let tag = match test.status {
            TestStatus::Pass => label("Passed").green().bold(),
            TestStatus::Fail => label("Failed").red(),
            TestStatus::Skip => label("Skipped").cyan(),
            TestStatus::Unknown | TestStatus::BuildFail => return,
        };
        let message = format!(
            "{} in {}",
            self.qualified_name(package, &test.name),
            format_duration(test.elapsed)
        );
        self.status_line(tag, message);
    }

    fn benchmark_finished(&mut self, package: &str, bench: &BenchmarkRecord) {
        let message = format!(
            "{} in {} iterations, {}/op, {} B/op, {} allocs/op",
            self.qualified_name(package, &bench.name),
            bench.iterations,
            bench.format_time(),
            bench.bytes_per_op,
            bench.allocs_per_op
        );
        self.status_line(label("Done").green().bold(), message);
    }

    fn package_finished(&mut self, package: &PackageAggregate) {
        let message = format!(
            "test package({}) result: {}, {} passed, {} failed, {} skipped, finished in {}",
            package.name,
            styled_status(package.status),
            package.passed,
            package.failed,
            package.skipped,
            format_duration(package.elapsed)
        );
        self.status_line(label("Finished").green().bold(), message);
    }

    fn output(&mut self, text: &str) {
        self.emit(|out| out.write_all(text.as_bytes()));
    }

    fn diagnostic(&mut self, line: &str) {
        self.emit(|out| writeln!(out, "{}: {}", style("warning").yellow().bold(), line));
    }

    fn summary(&mut self, summary: &TestSummary) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        let table = summary.render_table();
        let total = if summary.has_failures() {
            style(summary.render_total()).red().bold()
        } else {
            style(summary.render_total()).green()
        };
        self.emit(|out| {
            writeln!(out)?;
            writeln!(out, "Test summary:")?;
            write!(out, "{}", table)?;
            writeln!(out)?;
            writeln!(out, "{}", total)?;
            writeln!(out)
        });
    }
}

impl<W> Drop for ConsoleReporter<W> {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

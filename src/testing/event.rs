//! Test event decoding
//!
//! `go test -json` writes one JSON object per line. Each line is decoded once
//! into a [`TestEvent`] whose action tag is a closed enum, so the dispatcher
//! can match on it exhaustively.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AnalyzerError;

/// Non-JSON lines the go tool is known to mix into the stream
const DIAGNOSTIC_PREFIXES: &[&str] = &["warning: ignoring symlink", "go: downloading"];

/// Action tag of a test event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Action {
    /// The test binary is about to be executed
    Start,
    /// A test has started running
    Run,
    /// A test has been paused
    Pause,
    /// A paused test continued running
    Cont,
    /// A test or package passed
    Pass,
    /// A test or package failed
    Fail,
    /// A test was skipped or a package had no tests
    Skip,
    /// A benchmark printed log output but did not fail
    Bench,
    /// A test printed output
    Output,
    /// The build printed output
    BuildOutput,
    /// Any tag this version does not know about
    Unknown(String),
}

impl From<String> for Action {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "start" => Action::Start,
            "run" => Action::Run,
            "pause" => Action::Pause,
            "cont" => Action::Cont,
            "pass" => Action::Pass,
            "fail" => Action::Fail,
            "skip" => Action::Skip,
            "bench" | "bench-output" => Action::Bench,
            "output" => Action::Output,
            "build-output" => Action::BuildOutput,
            _ => Action::Unknown(tag),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Action::Start => "start",
            Action::Run => "run",
            Action::Pause => "pause",
            Action::Cont => "cont",
            Action::Pass => "pass",
            Action::Fail => "fail",
            Action::Skip => "skip",
            Action::Bench => "bench",
            Action::Output => "output",
            Action::BuildOutput => "build-output",
            Action::Unknown(tag) => tag,
        };
        f.write_str(tag)
    }
}

/// One decoded record of the test event stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    #[serde(default, alias = "time")]
    pub time: Option<DateTime<Utc>>,
    #[serde(alias = "action")]
    pub action: Action,
    #[serde(default, alias = "package")]
    pub package: String,
    #[serde(default, alias = "test")]
    pub test: Option<String>,
    /// Elapsed wall time in seconds
    #[serde(default, alias = "elapsed")]
    pub elapsed: Option<f64>,
    #[serde(default, alias = "output")]
    pub output: Option<String>,
    /// Set on a package `fail` when the test binary did not build
    #[serde(default, alias = "failedBuild")]
    pub failed_build: Option<String>,
}

impl TestEvent {
    /// Test name, treating an empty name as absent
    pub fn test_name(&self) -> Option<&str> {
        self.test.as_deref().filter(|name| !name.is_empty())
    }

    /// Elapsed time as a duration, zero when absent or not representable
    pub fn elapsed(&self) -> Duration {
        self.elapsed
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_default()
    }

    /// Raw output text, treating an empty string as absent
    pub fn output_text(&self) -> Option<&str> {
        self.output.as_deref().filter(|text| !text.is_empty())
    }

    /// Whether this package-level event marks a build failure
    pub fn is_build_failure(&self) -> bool {
        self.failed_build.as_deref().is_some_and(|b| !b.is_empty())
    }
}

/// Outcome of decoding a single raw line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(TestEvent),
    /// A known non-JSON line, shown to the user as-is
    Diagnostic(String),
    Blank,
}

/// Decode one raw line of the event stream
pub fn decode_line(line: &str) -> Result<Decoded, AnalyzerError> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    if line.trim().is_empty() {
        return Ok(Decoded::Blank);
    }

    if DIAGNOSTIC_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        return Ok(Decoded::Diagnostic(line.to_string()));
    }

    serde_json::from_str(line)
        .map(Decoded::Event)
        .map_err(|source| AnalyzerError::Decode {
            line: line.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_event(line: &str) -> TestEvent {
        match decode_line(line).unwrap() {
            Decoded::Event(event) => event,
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_go_event() {
        let event = decode_event(
            r#"{"Time":"2024-03-01T10:00:00.123456789+08:00","Action":"pass","Package":"example.com/m/util","Test":"TestJoin","Elapsed":0.25}"#,
        );

        assert_eq!(event.action, Action::Pass);
        assert_eq!(event.package, "example.com/m/util");
        assert_eq!(event.test_name(), Some("TestJoin"));
        assert_eq!(event.elapsed(), Duration::from_millis(250));
        assert_eq!(
            event.time.unwrap().to_rfc3339(),
            "2024-03-01T02:00:00.123456789+00:00"
        );
        assert!(!event.is_build_failure());
    }

    #[test]
    fn test_decode_lowercase_fields() {
        let event = decode_event(
            r#"{"time":"2024-03-01T10:00:00Z","action":"fail","package":"example.com/m","failedBuild":"example.com/m.test"}"#,
        );

        assert_eq!(event.action, Action::Fail);
        assert_eq!(event.test_name(), None);
        assert!(event.is_build_failure());
        assert_eq!(event.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_decode_action_tags() {
        assert_eq!(Action::from("build-output".to_string()), Action::BuildOutput);
        assert_eq!(Action::from("bench-output".to_string()), Action::Bench);
        assert_eq!(
            Action::from("build-fail".to_string()),
            Action::Unknown("build-fail".to_string())
        );
        assert_eq!(Action::Unknown("build-fail".to_string()).to_string(), "build-fail");
        assert_eq!(Action::BuildOutput.to_string(), "build-output");
    }

    #[test]
    fn test_decode_unknown_action_is_not_an_error() {
        let event = decode_event(r#"{"Action":"attr","Package":"example.com/m"}"#);
        assert_eq!(event.action, Action::Unknown("attr".to_string()));
    }

    #[test]
    fn test_decode_diagnostic_line() {
        let decoded = decode_line("warning: ignoring symlink /src/link\n").unwrap();
        assert_eq!(
            decoded,
            Decoded::Diagnostic("warning: ignoring symlink /src/link".to_string())
        );
    }

    #[test]
    fn test_decode_blank_line() {
        assert_eq!(decode_line("\r\n").unwrap(), Decoded::Blank);
        assert_eq!(decode_line("   ").unwrap(), Decoded::Blank);
    }

    #[test]
    fn test_decode_garbage_keeps_line() {
        let err = decode_line("panic: something went wrong").unwrap_err();
        match err {
            AnalyzerError::Decode { line, .. } => {
                assert_eq!(line, "panic: something went wrong");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_negative_elapsed_is_zero() {
        let event = decode_event(r#"{"Action":"pass","Package":"p","Elapsed":-1.0}"#);
        assert_eq!(event.elapsed(), Duration::ZERO);
    }
}

//! Stream driver
//!
//! Runs the decode→dispatch loop as its own tokio task over any async byte
//! stream. The task owns the analyzer state exclusively; callers only hold the
//! join handle and wait for the final report.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use super::analyzer::{AnalysisReport, AnalyzerOptions, AnalyzerState};
use super::reporter::TestReporter;
use crate::error::AnalyzerError;

/// Handle to a running analysis task
pub struct Analyzer {
    handle: JoinHandle<Result<AnalysisReport, AnalyzerError>>,
}

impl Analyzer {
    /// Start analyzing `reader` on a background task
    pub fn spawn<R, P>(reader: R, options: AnalyzerOptions, reporter: P) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        P: TestReporter + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut reporter = reporter;
            analyze_stream(reader, options, &mut reporter).await
        });
        Self { handle }
    }

    /// Wait until the stream is drained or the analysis aborts
    pub async fn wait(self) -> Result<AnalysisReport, AnalyzerError> {
        self.handle.await?
    }
}

/// Drain `reader` line by line until end of stream
///
/// The summary is produced only when the stream ends cleanly. A decode or
/// dispatch error stops the loop immediately; notifications already delivered
/// stay delivered.
pub async fn analyze_stream<R>(
    reader: R,
    options: AnalyzerOptions,
    reporter: &mut dyn TestReporter,
) -> Result<AnalysisReport, AnalyzerError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut state = AnalyzerState::new(options);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        state.handle_line(&line, reporter)?;
    }

    debug!(packages = state.packages().len(), "test event stream closed");
    Ok(state.finish_run(reporter))
}

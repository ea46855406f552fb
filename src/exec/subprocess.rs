//! Subprocess execution
//!
//! Blocking helpers for the thin `go` wrappers, plus [`spawn_streaming`] which
//! merges a child's stdout and stderr into one async byte stream for the test
//! analyzer.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::GocartError;

/// Lines buffered between the output pumps and the sink
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Result of a subprocess execution
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,

    /// Process exit code, -1 when terminated by a signal
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl CommandResult {
    /// Create a CommandResult from an exit status
    pub fn from_status(status: ExitStatus, stdout: String, stderr: String, duration: Duration) -> Self {
        let exit_code = status.code().unwrap_or(-1);
        Self {
            success: status.success(),
            exit_code,
            stdout,
            stderr,
            duration,
        }
    }

    /// Turn a non-zero exit into an error naming the command
    pub fn ensure_success(self, program: &str, args: &[String]) -> Result<Self> {
        if !self.success {
            return Err(GocartError::process_failed(format_command_args(program, args), self.exit_code).into());
        }
        Ok(self)
    }
}

/// Render a command line for messages
pub fn format_command_args(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        return program.to_string();
    }
    format!("{} {}", program, args.join(" "))
}

/// Run a command, either inheriting the terminal or capturing its output
pub fn run_command(
    program: &str,
    args: &[String],
    inherit_io: bool,
    envs: &[(String, String)],
) -> Result<CommandResult> {
    run_command_in(program, args, inherit_io, envs, None)
}

/// Like [`run_command`], with an explicit working directory
pub fn run_command_in(
    program: &str,
    args: &[String],
    inherit_io: bool,
    envs: &[(String, String)],
    dir: Option<&Path>,
) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    debug!(command = %format_command_args(program, args), ?envs, ?dir, "executing");

    let result = if inherit_io {
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        let status = cmd
            .status()
            .with_context(|| format!("could not exec command: `{}`", format_command_args(program, args)))?;

        CommandResult::from_status(status, String::new(), String::new(), start.elapsed())
    } else {
        let output = cmd
            .output()
            .with_context(|| format!("could not exec command: `{}`", format_command_args(program, args)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        CommandResult::from_status(output.status, stdout, stderr, start.elapsed())
    };

    debug!(
        program,
        exit_code = result.exit_code,
        elapsed = ?result.duration,
        "command finished"
    );
    Ok(result)
}

/// Run a command attached to the terminal and fail on a non-zero exit
pub fn run_checked(program: &str, args: &[String], envs: &[(String, String)]) -> Result<()> {
    run_command(program, args, true, envs)?.ensure_success(program, args)?;
    Ok(())
}

/// [`run_checked`] inside `dir`
pub fn run_checked_in(program: &str, args: &[String], dir: &Path) -> Result<()> {
    run_command_in(program, args, true, &[], Some(dir))?.ensure_success(program, args)?;
    Ok(())
}

/// Replace the current process with `program` (Unix), or run it and exit
/// with its status elsewhere
pub fn exec_replace(program: &Path, args: &[String]) -> Result<()> {
    let display = format_command_args(&program.display().to_string(), args);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        // exec only returns on failure
        let err = Command::new(program).args(args).exec();
        Err(err).with_context(|| format!("could not exec command: `{}`", display))
    }

    #[cfg(not(unix))]
    {
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("could not exec command: `{}`", display))?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

/// A child whose stdout and stderr are being read line by line
pub struct StreamingChild {
    child: tokio::process::Child,
    lines: mpsc::Receiver<Vec<u8>>,
    pumps: [tokio::task::JoinHandle<io::Result<()>>; 2],
    start: Instant,
}

/// Spawn `cmd` with piped output, ready to be forwarded with
/// [`StreamingChild::forward`]
pub fn spawn_streaming(mut cmd: tokio::process::Command) -> Result<StreamingChild> {
    let start = Instant::now();
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().context("could not start child process")?;
    let stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;

    let (tx, lines) = mpsc::channel::<Vec<u8>>(LINE_CHANNEL_CAPACITY);
    let pumps = [
        tokio::spawn(pump_lines(stdout, tx.clone())),
        tokio::spawn(pump_lines(stderr, tx)),
    ];

    Ok(StreamingChild {
        child,
        lines,
        pumps,
        start,
    })
}

impl StreamingChild {
    /// Copy the child's merged output into `sink` until both streams close,
    /// then wait for the child to exit
    ///
    /// `sink` is shut down only after both output streams reached end of file,
    /// so a reader on the other side sees every line before end of stream. If
    /// the sink stops accepting data the child's output is drained and dropped,
    /// which keeps the child from blocking on a full pipe. Ctrl-C kills the child.
    pub async fn forward<W>(self, mut sink: W) -> Result<CommandResult>
    where
        W: AsyncWrite + Unpin,
    {
        let Self {
            mut child,
            mut lines,
            pumps,
            start,
        } = self;

        let mut sink_open = true;
        loop {
            tokio::select! {
                line = lines.recv() => match line {
                    Some(line) => {
                        if sink_open {
                            if let Err(err) = sink.write_all(&line).await {
                                debug!(error = %err, "output reader went away, discarding the rest");
                                sink_open = false;
                            }
                        }
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupted, stopping child process");
                    if let Err(err) = child.start_kill() {
                        debug!(error = %err, "child already exited");
                    }
                }
            }
        }

        if sink_open {
            if let Err(err) = sink.shutdown().await {
                debug!(error = %err, "failed to close output sink");
            }
        }
        drop(sink);

        for pump in pumps {
            if let Err(err) = pump.await.context("output pump task failed")? {
                warn!(error = %err, "failed to read child output");
            }
        }

        let status = child.wait().await.context("could not wait for process finish")?;
        Ok(CommandResult::from_status(
            status,
            String::new(),
            String::new(),
            start.elapsed(),
        ))
    }
}

async fn pump_lines<R>(reader: R, tx: mpsc::Sender<Vec<u8>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if tx.send(line).await.is_err() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_command_args() {
        assert_eq!(format_command_args("go", &[]), "go");
        assert_eq!(
            format_command_args("go", &["test".to_string(), "-json".to_string()]),
            "go test -json"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_success_reports_exit_code() {
        let result = run_command("sh", &["-c".to_string(), "exit 3".to_string()], false, &[]).unwrap();
        assert_eq!(result.exit_code, 3);

        let err = result
            .ensure_success("sh", &["-c".to_string(), "exit 3".to_string()])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "process didn't exit successfully: `sh -c exit 3` (exit code: 3)"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streaming_merges_output() {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2; exit 2");

        let (writer, mut reader) = tokio::io::duplex(1024);
        let reading = tokio::spawn(async move {
            let mut collected = String::new();
            tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut collected)
                .await
                .unwrap();
            collected
        });

        let result = spawn_streaming(cmd).unwrap().forward(writer).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 2);

        let collected = reading.await.unwrap();
        let mut lines: Vec<&str> = collected.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streaming_survives_closed_reader() {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg("for i in 1 2 3 4 5; do echo line $i; done");

        let (writer, reader) = tokio::io::duplex(8);
        drop(reader);

        let result = spawn_streaming(cmd).unwrap().forward(writer).await.unwrap();
        assert!(result.success);
    }
}

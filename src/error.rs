//! Error types and helpers for user-friendly error messages
//!
//! `GocartError` covers the command layer and carries actionable hints.
//! `AnalyzerError` is raised by the test event analyzer when the event stream
//! itself is broken, which is distinct from tests failing.

use thiserror::Error;

use crate::testing::event::Action;

/// Custom error types with helpful context and suggestions
#[derive(Error, Debug)]
pub enum GocartError {
    /// Configuration file errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        hint: Option<String>,
    },

    /// Tool/executable not found
    #[error("Missing tool: {tool}")]
    MissingTool {
        tool: String,
        required_for: String,
        hint: String,
    },

    /// Invalid project structure
    #[error("Invalid project structure: {message}")]
    ProjectStructure {
        message: String,
        expected: Vec<String>,
        hint: String,
    },

    /// A child process exited with a non-zero status
    #[error("process didn't exit successfully: `{command}` (exit code: {exit_code})")]
    Process { command: String, exit_code: i32 },
}

impl GocartError {
    /// Create a configuration error with source and hint
    pub fn config_error_with_hint(
        message: impl Into<String>,
        source: Option<anyhow::Error>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source,
            hint: Some(hint.into()),
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(
        tool: impl Into<String>,
        required_for: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::MissingTool {
            tool: tool.into(),
            required_for: required_for.into(),
            hint: hint.into(),
        }
    }

    /// Create a project structure error
    pub fn project_structure_error(
        message: impl Into<String>,
        expected: Vec<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::ProjectStructure {
            message: message.into(),
            expected,
            hint: hint.into(),
        }
    }

    /// Create a process failure error
    pub fn process_failed(command: impl Into<String>, exit_code: i32) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("{}: {}", style("error").red().bold(), self);

        match self {
            GocartError::Config { hint, .. } => {
                if let Some(h) = hint {
                    eprintln!("\n{} {}", style("HINT:").yellow().bold(), h);
                }
            }
            GocartError::MissingTool {
                hint, required_for, ..
            } => {
                eprintln!("  required for: {}", required_for);
                eprintln!("\n{} {}", style("HINT:").yellow().bold(), hint);
            }
            GocartError::ProjectStructure { hint, expected, .. } => {
                if !expected.is_empty() {
                    eprintln!("\n{}", style("EXPECTED:").cyan().bold());
                    for exp in expected {
                        eprintln!("  • {}", exp);
                    }
                }
                eprintln!("\n{} {}", style("HINT:").yellow().bold(), hint);
            }
            GocartError::Process { .. } => {}
        }
    }
}

/// Errors that abort a test analysis run
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// A line was neither a test event nor a known diagnostic
    #[error("failed to parse line: `{line}`")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// An event referenced a package before its `start` event
    #[error("invalid [{action}] event for package: {package}")]
    Dispatch { action: Action, package: String },

    /// Reading the event stream failed
    #[error("failed to read test output")]
    Io(#[from] std::io::Error),

    /// The analyzer task panicked or was cancelled
    #[error("test analyzer task did not complete")]
    Task(#[from] tokio::task::JoinError),
}

/// Common error hints
pub mod hints {
    /// Get hint for missing Go toolchain
    pub fn go() -> &'static str {
        "Install Go from https://go.dev/doc/install or use your package manager:\n\
         • macOS: brew install go\n\
         • Ubuntu: sudo apt install golang-go\n\
         • Windows: winget install GoLang.Go"
    }

    /// Get hint for missing git
    pub fn git() -> &'static str {
        "Install git from https://git-scm.com/downloads or use your package manager"
    }

    /// Get hint for go.mod not found
    pub fn go_mod_not_found() -> &'static str {
        "Could not find go.mod in current directory or any parent directory.\n\
         \n\
         To create a new Go module:\n\
         • Run: gocart new my-project\n\
         \n\
         To initialize a module in an existing directory:\n\
         • Run: gocart init"
    }

    /// Get hint for invalid Gocart.toml
    pub fn invalid_gocart_toml() -> &'static str {
        "Gocart.toml is invalid. Common issues:\n\
         • Invalid TOML syntax (check quotes, brackets, commas)\n\
         • Unknown keys in the [build] or [test] sections\n\
         • `cpus` must be a list of strings, e.g. [\"1\", \"4\"]"
    }
}

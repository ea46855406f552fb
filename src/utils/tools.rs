//! Tool detection with installation hints

use std::path::PathBuf;

use anyhow::Result;
use which::which;

use crate::error::{hints, GocartError};
use crate::exec::subprocess::run_command;

/// Tool detection result
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Path to the tool executable
    pub path: PathBuf,
}

/// Check if a tool exists and return its information
pub fn check_tool(tool_name: &str) -> Option<ToolInfo> {
    which(tool_name).ok().map(|path| ToolInfo {
        name: tool_name.to_string(),
        path,
    })
}

/// Require a tool to exist, return error with hint if missing
pub fn require_tool(tool_name: &str, required_for: &str) -> Result<ToolInfo> {
    check_tool(tool_name).ok_or_else(|| {
        GocartError::missing_tool(tool_name, required_for, get_tool_hint(tool_name)).into()
    })
}

/// The Go toolchain must be on PATH for every command but `version`
pub fn require_go() -> Result<ToolInfo> {
    require_tool("go", "building, running and testing Go packages")
}

/// First line of `go version`, if go can be run
pub fn go_version() -> Option<String> {
    let result = run_command("go", &["version".to_string()], false, &[]).ok()?;
    if !result.success {
        return None;
    }
    result
        .stdout
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

fn get_tool_hint(tool_name: &str) -> &'static str {
    match tool_name {
        "go" => hints::go(),
        "git" => hints::git(),
        _ => "Install this tool and ensure it's in your PATH",
    }
}

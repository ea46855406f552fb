//! Version command implementation

use anyhow::Result;
use clap::Args;

use crate::utils::tools::go_version;

const UNKNOWN: &str = "unknown";

/// Print version information
#[derive(Args, Debug)]
pub struct VersionCommand {}

impl VersionCommand {
    /// Execute the version command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        for line in version_lines(go_version()) {
            println!("{}", line);
        }
        Ok(())
    }
}

/// `Key: value` lines for the version report
pub fn version_lines(go_version: Option<String>) -> Vec<String> {
    vec![
        format!("Version: {}", env!("CARGO_PKG_VERSION")),
        format!("Git Commit: {}", option_env!("GOCART_GIT_COMMIT").unwrap_or(UNKNOWN)),
        format!("Build Time: {}", option_env!("GOCART_BUILD_TIME").unwrap_or(UNKNOWN)),
        format!("Go Version: {}", go_version.as_deref().unwrap_or(UNKNOWN)),
    ]
}

//! Run command implementation

use anyhow::Result;
use clap::Args;

use super::build::BuildCommand;
use crate::exec::subprocess::{exec_replace, format_command_args};
use crate::utils::terminal::print_status;

/// Compile and run a binary of the local package
///
/// Arguments after `--` are passed to the binary.
#[derive(Args, Debug)]
pub struct RunCommand {
    #[command(flatten)]
    pub build: BuildCommand,

    /// Arguments for the binary
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        let built = self.build.build()?;

        let shown = built
            .path
            .strip_prefix(&built.module.dir)
            .unwrap_or(&built.path);
        print_status(
            "Running",
            &format!("`{}`", format_command_args(&shown.display().to_string(), &self.args)),
        );

        exec_replace(&built.path, &self.args)
    }
}

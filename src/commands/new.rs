//! New project command implementation

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::init::InitCommand;

/// Create a new module at a path
#[derive(Args, Debug)]
pub struct NewCommand {
    /// Directory to create
    pub path: PathBuf,

    /// Module path, default to the directory name
    #[arg(long)]
    pub name: Option<String>,

    /// Initialize a new git repository
    #[arg(long)]
    pub git: bool,
}

impl NewCommand {
    /// Execute the new command
    pub fn execute(self, verbose: bool) -> Result<()> {
        InitCommand {
            path: Some(self.path),
            name: self.name,
            git: self.git,
        }
        .execute(verbose)
    }
}

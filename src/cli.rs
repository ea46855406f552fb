//! CLI argument parsing using clap derive macros

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    add::AddCommand, build::BuildCommand, clean::CleanCommand, init::InitCommand,
    new::NewCommand, remove::RemoveCommand, run::RunCommand, test::TestCommand,
    vendor::VendorCommand, version::VersionCommand,
};
use crate::logging;
use crate::utils::tools::require_go;

/// gocart - Go's package manager, Cargo style
///
/// Wraps the go toolchain with cargo-like commands and a readable test runner.
#[derive(Parser, Debug)]
#[command(name = "gocart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output: test output and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile the local package to a binary
    Build(BuildCommand),

    /// Compile and run a binary of the local package
    Run(RunCommand),

    /// Run the tests of the local package
    Test(TestCommand),

    /// Remove the binaries built for the local module
    Clean(CleanCommand),

    /// Create a new module at a path
    New(NewCommand),

    /// Create a new module in an existing directory
    Init(InitCommand),

    /// Add dependencies to go.mod
    Add(AddCommand),

    /// Remove dependencies from go.mod
    Remove(RemoveCommand),

    /// Copy dependencies into the vendor directory
    Vendor(VendorCommand),

    /// Print version information
    Version(VersionCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        logging::init(self.verbose);

        if !matches!(self.command, Commands::Version(_)) {
            require_go()?;
        }

        match self.command {
            Commands::Build(cmd) => cmd.execute(self.verbose),
            Commands::Run(cmd) => cmd.execute(self.verbose),
            Commands::Test(cmd) => cmd.execute(self.verbose),
            Commands::Clean(cmd) => cmd.execute(self.verbose),
            Commands::New(cmd) => cmd.execute(self.verbose),
            Commands::Init(cmd) => cmd.execute(self.verbose),
            Commands::Add(cmd) => cmd.execute(self.verbose),
            Commands::Remove(cmd) => cmd.execute(self.verbose),
            Commands::Vendor(cmd) => cmd.execute(self.verbose),
            Commands::Version(cmd) => cmd.execute(self.verbose),
        }
    }
}

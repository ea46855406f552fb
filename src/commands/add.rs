//! Add command - add dependencies with `go get`

use anyhow::{bail, Result};
use clap::Args;

use crate::config::GoModule;
use crate::exec::subprocess::run_checked;
use crate::utils::terminal::{print_status, print_warning};

/// Add dependencies to go.mod
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Packages to add, e.g. github.com/pkg/errors
    pub packages: Vec<String>,

    /// Revision to use; only applies when a single package is given
    #[arg(long)]
    pub rev: Option<String>,
}

impl AddCommand {
    /// Execute the add command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        let specs = go_get_specs(&self.packages, self.rev.as_deref());
        if specs.is_empty() {
            bail!("no dependencies specified");
        }

        let module = GoModule::locate()?;
        for spec in specs {
            print_status("Updating", &format!("module {} go.mod and go.sum", module.name));
            print_status("Adding", &spec);
            run_checked("go", &["get".to_string(), spec], &[])?;
        }

        print_warning("please run `go mod tidy` to update go.mod and go.sum");
        Ok(())
    }
}

/// Arguments for `go get`, one per package
///
/// `rev` is appended as `@rev` only for a single package without its own
/// version suffix.
pub fn go_get_specs(packages: &[String], rev: Option<&str>) -> Vec<String> {
    let packages: Vec<&str> = packages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    let single = packages.len() == 1;
    packages
        .into_iter()
        .map(|pkg| match rev.filter(|r| !r.is_empty()) {
            Some(rev) if single && !pkg.contains('@') => format!("{}@{}", pkg, rev),
            _ => pkg.to_string(),
        })
        .collect()
}

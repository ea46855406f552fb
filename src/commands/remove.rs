//! Remove command - drop requirements from go.mod and tidy

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::config::GoModule;
use crate::exec::subprocess::run_checked_in;
use crate::utils::terminal::{print_status, print_warning};

/// Remove dependencies from go.mod
#[derive(Args, Debug)]
pub struct RemoveCommand {
    /// Module paths to remove
    pub packages: Vec<String>,
}

impl RemoveCommand {
    /// Execute the remove command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        if self.packages.iter().all(|p| p.trim().is_empty()) {
            bail!("no dependencies specified");
        }

        let module = GoModule::locate()?;
        let content = std::fs::read_to_string(&module.go_mod_path)
            .with_context(|| format!("could not read {}", module.go_mod_path.display()))?;

        for package in self.packages.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            print_status("Removing", package);
        }
        let edit = remove_requirements(&content, &self.packages);
        for package in &edit.missing {
            print_warning(&format!("package {} not found in go.mod", package));
        }

        std::fs::write(&module.go_mod_path, edit.content)
            .with_context(|| format!("could not write file {}", module.go_mod_path.display()))?;

        print_status("Updating", "go.mod and go.sum");
        run_checked_in("go", &["mod".to_string(), "tidy".to_string()], &module.dir)
    }
}

/// Result of editing go.mod content
#[derive(Debug, PartialEq, Eq)]
pub struct RequirementEdit {
    pub content: String,
    /// Packages with no matching requirement line
    pub missing: Vec<String>,
}

/// Drop `require` lines naming any of `packages`
///
/// Matches both lines inside a `require ( … )` block and single-line
/// `require path version` directives.
pub fn remove_requirements(content: &str, packages: &[String]) -> RequirementEdit {
    let mut lines: Vec<&str> = content.lines().collect();
    let mut missing = Vec::new();

    for package in packages.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        let prefix = format!("{} ", package);
        let before = lines.len();
        lines.retain(|line| {
            let line = line.trim();
            let line = line.strip_prefix("require ").map(str::trim_start).unwrap_or(line);
            !line.starts_with(&prefix)
        });
        if lines.len() == before {
            missing.push(package.to_string());
        }
    }

    let mut content_out = lines.join("\n");
    if content.ends_with('\n') {
        content_out.push('\n');
    }
    RequirementEdit {
        content: content_out,
        missing,
    }
}

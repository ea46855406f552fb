//! Clean command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::config::GoModule;
use crate::utils::terminal::print_status;

/// Remove the binaries built for the local module
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Show what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanCommand {
    /// Execute the clean command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        let module = GoModule::locate()?;
        let config = module.config()?.build;
        let output_dir = module.dir.join(config.output_dir());

        let binaries = find_binaries(&output_dir, module.binary_name())?;
        if self.dry_run {
            print_status("Would remove", &format!("{} files", binaries.len()));
            print_files(&module.dir, &binaries);
            return Ok(());
        }

        let mut removed = Vec::new();
        for binary in binaries {
            match std::fs::remove_file(&binary) {
                Ok(()) => removed.push(binary),
                Err(err) => tracing::warn!(path = %binary.display(), error = %err, "could not remove file"),
            }
        }

        print_status("Removed", &format!("{} files", removed.len()));
        print_files(&module.dir, &removed);
        Ok(())
    }
}

/// Binaries named `<name>` or `<name>-*` directly inside `dir`
pub fn find_binaries(dir: &Path, name: &str) -> Result<Vec<PathBuf>> {
    let base = dir.join(name);
    let escaped = glob::Pattern::escape(&base.to_string_lossy());

    let mut found = Vec::new();
    for pattern in [escaped.clone(), format!("{}-*", escaped)] {
        let entries = glob::glob(&pattern).with_context(|| format!("invalid glob pattern: {}", pattern))?;
        found.extend(entries.filter_map(|entry| entry.ok()).filter(|p| p.is_file()));
    }
    found.sort();
    found.dedup();
    Ok(found)
}

fn print_files(root: &Path, files: &[PathBuf]) {
    for file in files {
        let shown = file.strip_prefix(root).unwrap_or(file);
        println!("       - {}", shown.display());
    }
}

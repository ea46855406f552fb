//! Init command implementation

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::config::gomod::GO_MOD_FILE;
use crate::exec::subprocess::run_checked_in;
use crate::utils::paths::ensure_dir;
use crate::utils::terminal::{print_status, print_warning};
use crate::utils::tools::check_tool;

const MAIN_GO_TEMPLATE: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("Hello, world!")
}
"#;

const GITIGNORE_TEMPLATE: &str = r#"# Binaries built by gocart
/bin/

# Test binaries and profiles
*.test
*.out
*.prof
"#;

/// Create a new module in an existing directory
#[derive(Args, Debug, Clone, Default)]
pub struct InitCommand {
    /// Directory to initialize, default to the current directory
    pub path: Option<PathBuf>,

    /// Module path, default to the directory name
    #[arg(long)]
    pub name: Option<String>,

    /// Initialize a new git repository
    #[arg(long)]
    pub git: bool,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        let dir = match &self.path {
            Some(path) => {
                ensure_dir(path)?;
                path.clone()
            }
            None => std::env::current_dir().context("could not get current directory")?,
        };

        if dir.join(GO_MOD_FILE).exists() {
            bail!("`{}` already exists in {}", GO_MOD_FILE, dir.display());
        }

        let name = module_name(&dir, self.name.as_deref())?;
        print_status("Created", &format!("package `{}`", name));
        run_checked_in("go", &["mod".to_string(), "init".to_string(), name], &dir)?;

        write_templates(&dir)?;

        if self.git && !dir.join(".git").exists() {
            init_git(&dir);
        }
        Ok(())
    }
}

/// Module path for `dir`: the explicit name, or the directory's own name
pub fn module_name(dir: &Path, name: Option<&str>) -> Result<String> {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    let absolute = dir
        .canonicalize()
        .with_context(|| format!("could not resolve {}", dir.display()))?;
    match absolute.file_name() {
        Some(name) => Ok(name.to_string_lossy().into_owned()),
        None => bail!("cannot derive a module name from {}, pass --name", absolute.display()),
    }
}

/// Write `main.go` and `.gitignore` unless they already exist
pub fn write_templates(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (file, content) in [("main.go", MAIN_GO_TEMPLATE), (".gitignore", GITIGNORE_TEMPLATE)] {
        let path = dir.join(file);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("could not write file {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

// A failed `git init` leaves a usable module behind, so it only warns.
fn init_git(dir: &Path) {
    if check_tool("git").is_none() {
        print_warning("could not initialize git repository: git is not installed");
        return;
    }
    if let Err(err) = run_checked_in("git", &["init".to_string()], dir) {
        print_warning(&format!("could not initialize git repository: {}", err));
    }
}

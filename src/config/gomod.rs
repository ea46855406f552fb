//! Go module discovery
//!
//! Finds the enclosing `go.mod` and reads the module path from it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::gocart_toml::GocartConfig;
use crate::error::{hints, GocartError};
use crate::exec::subprocess::run_command;

/// Module file name
pub const GO_MOD_FILE: &str = "go.mod";

/// The Go module the current directory belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Module path from the `module` directive, e.g. `example.com/m`
    pub name: String,

    /// Directory containing `go.mod`
    pub dir: PathBuf,

    /// Full path of `go.mod`
    pub go_mod_path: PathBuf,
}

impl GoModule {
    /// Locate the module for the current directory
    ///
    /// Walks up from the current directory first and asks `go env GOMOD`
    /// when no `go.mod` is found on the way.
    pub fn locate() -> Result<Self> {
        let cwd = std::env::current_dir().context("could not get current directory")?;
        if let Some(module) = Self::find_from(&cwd)? {
            return Ok(module);
        }

        debug!(cwd = %cwd.display(), "no go.mod above current directory, asking go env");
        let go_mod_path = go_env_gomod()?.ok_or_else(not_found)?;
        Self::load(&go_mod_path)
    }

    /// Find the module enclosing `start` by walking up the directory tree
    pub fn find_from(start: &Path) -> Result<Option<Self>> {
        let mut dir = start;
        loop {
            let candidate = dir.join(GO_MOD_FILE);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Ok(None),
            }
        }
    }

    /// Read a module from a `go.mod` path
    pub fn load(go_mod_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(go_mod_path)
            .with_context(|| format!("could not read {}", go_mod_path.display()))?;

        let name = parse_module_name(&content).ok_or_else(|| {
            GocartError::project_structure_error(
                format!("module declaration not found in {}", go_mod_path.display()),
                vec!["a `module <path>` line in go.mod".to_string()],
                "Run `go mod edit -module <path>` to set the module path",
            )
        })?;

        let dir = go_mod_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!(module = %name, dir = %dir.display(), "found go module");
        Ok(Self {
            name,
            dir,
            go_mod_path: go_mod_path.to_path_buf(),
        })
    }

    /// Default binary name: the last segment of the module path
    pub fn binary_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Load the optional Gocart.toml next to `go.mod`
    pub fn config(&self) -> Result<GocartConfig> {
        GocartConfig::load_from_dir(&self.dir)
    }
}

/// Extract the module path from `go.mod` content
pub fn parse_module_name(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = rest.trim().trim_matches(|c| c == '"' || c == '`');
        (!name.is_empty()).then(|| name.to_string())
    })
}

fn go_env_gomod() -> Result<Option<PathBuf>> {
    let result = run_command("go", &["env".to_string(), "GOMOD".to_string()], false, &[])?;
    if !result.success {
        debug!(stderr = %result.stderr.trim(), "go env GOMOD failed");
        return Ok(None);
    }
    let path = result.stdout.trim();
    if path.is_empty() || path == "/dev/null" || path == "NUL" {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(path)))
}

fn not_found() -> GocartError {
    GocartError::project_structure_error(
        "could not find go.mod file",
        vec!["go.mod in the current directory or a parent directory".to_string()],
        hints::go_mod_not_found(),
    )
}

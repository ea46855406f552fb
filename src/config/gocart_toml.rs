//! Gocart.toml configuration parsing
//!
//! The file is optional and lives next to `go.mod`. It only provides defaults
//! for flags; anything given on the command line wins.
//!
//! ```toml
//! [build]
//! output_dir = "bin"
//! vendor = false
//! set = ["main.version=1.0.0"]
//!
//! [test]
//! cpus = ["1", "4"]
//! race = false
//! timeout = "30s"
//! count = 1
//! fail_fast = false
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::validation::validate_config;
use crate::error::{hints, GocartError};

/// Configuration file name
pub const CONFIG_FILE: &str = "Gocart.toml";

/// Root configuration from Gocart.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GocartConfig {
    /// Defaults for `build` and `run`
    #[serde(default)]
    pub build: BuildConfig,

    /// Defaults for `test`
    #[serde(default)]
    pub test: TestConfig,
}

/// `[build]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Output directory relative to the module root, `bin` when unset
    pub output_dir: Option<String>,

    /// Build with `-mod=vendor`
    #[serde(default)]
    pub vendor: bool,

    /// `-X` assignments, e.g. `main.version=1.0.0`
    #[serde(default)]
    pub set: Vec<String>,
}

/// `[test]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// GOMAXPROCS values passed as `-cpu`
    #[serde(default)]
    pub cpus: Vec<String>,

    #[serde(default)]
    pub race: bool,

    /// Go duration string, e.g. `30s` or `5m`
    pub timeout: Option<String>,

    pub count: Option<u32>,

    #[serde(default)]
    pub fail_fast: bool,
}

impl BuildConfig {
    /// Output directory name, defaulting to `bin`
    pub fn output_dir(&self) -> &str {
        self.output_dir.as_deref().unwrap_or("bin")
    }
}

impl GocartConfig {
    /// Load `Gocart.toml` from a module directory, or defaults when absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("could not read configuration from {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|err| {
            GocartError::config_error_with_hint(
                format!("failed to parse {}", CONFIG_FILE),
                Some(err.into()),
                hints::invalid_gocart_toml(),
            )
        })?;
        validate_config(&config)?;
        Ok(config)
    }
}

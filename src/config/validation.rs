//! Gocart.toml validation with actionable hints

use anyhow::Result;

use super::gocart_toml::{BuildConfig, GocartConfig, TestConfig};
use crate::error::GocartError;

/// Validate a parsed configuration
pub fn validate_config(config: &GocartConfig) -> Result<()> {
    validate_build_config(&config.build)?;
    validate_test_config(&config.test)?;
    Ok(())
}

fn validate_build_config(build: &BuildConfig) -> Result<()> {
    if let Some(dir) = &build.output_dir {
        if dir.trim().is_empty() {
            return Err(GocartError::config_error_with_hint(
                "build.output_dir cannot be empty",
                None,
                "Remove the key to use the default `bin` directory",
            )
            .into());
        }
    }

    for assignment in &build.set {
        match assignment.split_once('=') {
            Some((name, _)) if !name.trim().is_empty() => {}
            _ => {
                return Err(GocartError::config_error_with_hint(
                    format!("invalid build.set entry `{}`", assignment),
                    None,
                    "Entries take the form `importpath.name=value`, e.g. \"main.version=1.0.0\"",
                )
                .into());
            }
        }
    }

    Ok(())
}

fn validate_test_config(test: &TestConfig) -> Result<()> {
    for cpu in &test.cpus {
        if !matches!(cpu.trim().parse::<u32>(), Ok(n) if n > 0) {
            return Err(GocartError::config_error_with_hint(
                format!("invalid test.cpus entry `{}`", cpu),
                None,
                "Each entry must be a positive integer written as a string, e.g. [\"1\", \"4\"]",
            )
            .into());
        }
    }

    if test.count == Some(0) {
        return Err(GocartError::config_error_with_hint(
            "test.count must be at least 1",
            None,
            "Remove the key to run each test once",
        )
        .into());
    }

    if let Some(timeout) = &test.timeout {
        if timeout.trim().is_empty() {
            return Err(GocartError::config_error_with_hint(
                "test.timeout cannot be empty",
                None,
                "Use a Go duration such as \"30s\" or \"10m\"",
            )
            .into());
        }
    }

    Ok(())
}

//! Path utilities

use std::path::{Component, Path};

use anyhow::{bail, Context, Result};

/// Suffix selecting a package and everything below it
pub const ALL_PACKAGES_SUFFIX: &str = "/...";

/// Resolve a user-supplied package argument to a Go import path
///
/// - empty or `.`: the package of `cwd`
/// - already under `module`: used as is
/// - otherwise a path relative to `cwd` that must exist; a file selects its
///   directory
pub fn resolve_go_package(module: &str, module_dir: &Path, cwd: &Path, package: &str) -> Result<String> {
    if package.is_empty() || package == "." {
        let rel = cwd.strip_prefix(module_dir).unwrap_or(Path::new(""));
        return Ok(join_import_path(module, rel));
    }

    if package == module || package.starts_with(&format!("{}/", module)) {
        return Ok(package.to_string());
    }

    let path = cwd.join(package);
    let metadata = match std::fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(_) => bail!("package `{}` does not exist", package),
    };
    let dir = if metadata.is_dir() {
        path.as_path()
    } else {
        path.parent().unwrap_or(cwd)
    };

    let dir = dir
        .canonicalize()
        .with_context(|| format!("could not resolve {}", dir.display()))?;
    let root = module_dir
        .canonicalize()
        .with_context(|| format!("could not resolve {}", module_dir.display()))?;
    match dir.strip_prefix(&root) {
        Ok(rel) => Ok(join_import_path(module, rel)),
        Err(_) => bail!("package `{}` is outside module `{}`", package, module),
    }
}

/// Resolve a package that may carry a trailing `/...`, keeping the suffix
pub fn resolve_go_package_pattern(
    module: &str,
    module_dir: &Path,
    cwd: &Path,
    package: &str,
) -> Result<String> {
    match package.strip_suffix(ALL_PACKAGES_SUFFIX) {
        Some(base) => {
            let base = if base.is_empty() { "." } else { base };
            let resolved = resolve_go_package(module, module_dir, cwd, base)?;
            Ok(format!("{}{}", resolved, ALL_PACKAGES_SUFFIX))
        }
        None => resolve_go_package(module, module_dir, cwd, package),
    }
}

fn join_import_path(module: &str, rel: &Path) -> String {
    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        module.to_string()
    } else {
        format!("{}/{}", module, segments.join("/"))
    }
}

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("could not create directory: {}", path.display()))?;
    }
    Ok(())
}

//! Build command implementation

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::gocart_toml::BuildConfig;
use crate::config::GoModule;
use crate::exec::subprocess::run_checked;
use crate::utils::paths::{ensure_dir, resolve_go_package};
use crate::utils::terminal::{format_duration, print_status};

const EXE_SUFFIX: &str = ".exe";

/// Compile the local package to a binary
#[derive(Args, Debug, Clone, Default)]
pub struct BuildCommand {
    /// Build for the target triple, e.g. linux/amd64
    #[arg(short, long)]
    pub target: Option<String>,

    /// Build artifacts in release mode, with optimizations
    #[arg(short, long)]
    pub release: bool,

    /// Output binary name, default to the last module path segment
    #[arg(short, long)]
    pub output: Option<String>,

    /// Package to build
    #[arg(short, long)]
    pub package: Option<String>,

    /// Build into the current directory instead of bin/
    #[arg(short, long)]
    pub local: bool,

    /// Build with CGO disabled
    #[arg(short = 'z', long)]
    pub cgo_zero: bool,

    /// Build with the vendor directory
    #[arg(long)]
    pub vendor: bool,

    /// Set string variables through `-ldflags -X`, e.g. main.version=1.0.0
    #[arg(short = 'x', long = "set", value_delimiter = ',')]
    pub set: Vec<String>,
}

/// A binary produced by [`BuildCommand::build`]
#[derive(Debug)]
pub struct BuiltBinary {
    pub module: GoModule,
    pub path: PathBuf,
}

/// Target platform split out of `os/arch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub os: Option<String>,
    pub arch: Option<String>,
    /// Binary file name including platform suffixes
    pub file_name: String,
}

impl BuildTarget {
    /// Environment passed to `go build` for cross compilation
    pub fn envs(&self) -> Vec<(String, String)> {
        let mut envs = Vec::new();
        if let Some(os) = &self.os {
            envs.push(("GOOS".to_string(), os.clone()));
        }
        if let Some(arch) = &self.arch {
            envs.push(("GOARCH".to_string(), arch.clone()));
        }
        envs
    }
}

/// Derive the output file name from a base name and an optional `os/arch`
///
/// Cross builds get `-os` and `-arch` suffixes; Windows targets (or a Windows
/// host without a target) get `.exe` unless the name already has it.
pub fn parse_build_target(name: &str, target: Option<&str>, host_is_windows: bool) -> BuildTarget {
    let mut os = None;
    let mut arch = None;
    let mut needs_exe = false;

    match target.filter(|t| !t.is_empty()) {
        Some(target) => {
            let mut parts = target.split('/');
            if let Some(target_os) = parts.next().filter(|s| !s.is_empty()) {
                needs_exe = target_os.contains("windows") && !name.ends_with(EXE_SUFFIX);
                os = Some(target_os.to_string());
            }
            arch = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        }
        None => needs_exe = host_is_windows && !name.ends_with(EXE_SUFFIX),
    }

    let mut file_name = name.to_string();
    if let Some(os) = &os {
        file_name.push('-');
        file_name.push_str(os);
    }
    if let Some(arch) = &arch {
        file_name.push('-');
        file_name.push_str(arch);
    }
    if needs_exe {
        file_name.push_str(EXE_SUFFIX);
    }

    BuildTarget { os, arch, file_name }
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        self.build()?;
        Ok(())
    }

    /// Build the binary and return where it was written
    pub fn build(&self) -> Result<BuiltBinary> {
        let start = Instant::now();
        let module = GoModule::locate()?;
        let config = module.config()?.build;
        let cwd = std::env::current_dir().context("could not get current directory")?;

        let name = match &self.output {
            Some(output) => Path::new(output)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| output.clone()),
            None => module.binary_name().to_string(),
        };
        let target = parse_build_target(&name, self.target.as_deref(), cfg!(windows));

        let output_dir = if self.local {
            cwd.clone()
        } else {
            let dir = module.dir.join(config.output_dir());
            ensure_dir(&dir)?;
            dir
        };
        let output = output_dir.join(&target.file_name);

        let package = resolve_go_package(
            &module.name,
            &module.dir,
            &cwd,
            self.package.as_deref().unwrap_or(""),
        )?;

        let mut envs = target.envs();
        if self.cgo_zero {
            envs.push(("CGO_ENABLED".to_string(), "0".to_string()));
        }

        print_status("Compiling", &format!("{} ({})", module.name, output.display()));
        let args = self.go_build_args(&output, &package, &config);
        run_checked("go", &args, &envs)?;

        print_status(
            "Finished",
            &format!("`{}` target(s) in {}", self.profile(), format_duration(start.elapsed())),
        );

        Ok(BuiltBinary {
            module,
            path: output,
        })
    }

    fn profile(&self) -> &'static str {
        if self.release {
            "release"
        } else {
            "dev"
        }
    }

    /// Arguments for `go build`, with Gocart.toml values merged in
    pub fn go_build_args(&self, output: &Path, package: &str, config: &BuildConfig) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];

        if self.vendor || config.vendor {
            args.push("-mod=vendor".to_string());
        }
        if self.release {
            args.push("-trimpath".to_string());
        }

        let mut ldflags: Vec<String> = Vec::new();
        if self.release {
            ldflags.push("-s".to_string());
            ldflags.push("-w".to_string());
        }
        for assignment in config.set.iter().chain(&self.set) {
            ldflags.push(format!("-X '{}'", assignment));
        }
        if !ldflags.is_empty() {
            args.push("-ldflags".to_string());
            args.push(ldflags.join(" "));
        }

        args.push(package.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_target_name() {
        let target = parse_build_target("app", None, false);
        assert_eq!(target.file_name, "app");
        assert!(target.envs().is_empty());

        assert_eq!(parse_build_target("app", None, true).file_name, "app.exe");
        assert_eq!(parse_build_target("app.exe", None, true).file_name, "app.exe");
    }

    #[test]
    fn test_cross_target_name() {
        let target = parse_build_target("app", Some("linux/arm64"), true);
        assert_eq!(target.file_name, "app-linux-arm64");
        assert_eq!(
            target.envs(),
            vec![
                ("GOOS".to_string(), "linux".to_string()),
                ("GOARCH".to_string(), "arm64".to_string()),
            ]
        );

        assert_eq!(
            parse_build_target("app", Some("windows/amd64"), false).file_name,
            "app-windows-amd64.exe"
        );
        assert_eq!(parse_build_target("app", Some("darwin"), false).file_name, "app-darwin");
    }

    #[test]
    fn test_dev_build_args() {
        let cmd = BuildCommand::default();
        let args = cmd.go_build_args(Path::new("/m/bin/app"), "example.com/m", &BuildConfig::default());
        assert_eq!(args, vec!["build", "-o", "/m/bin/app", "example.com/m"]);
    }

    #[test]
    fn test_release_build_args_with_variables() {
        let cmd = BuildCommand {
            release: true,
            vendor: true,
            set: vec!["main.commit=abc".to_string()],
            ..Default::default()
        };
        let config = BuildConfig {
            set: vec!["main.version=1.0.0".to_string()],
            ..Default::default()
        };

        let args = cmd.go_build_args(Path::new("/m/bin/app"), "example.com/m", &config);
        assert_eq!(
            args,
            vec![
                "build",
                "-o",
                "/m/bin/app",
                "-mod=vendor",
                "-trimpath",
                "-ldflags",
                "-s -w -X 'main.version=1.0.0' -X 'main.commit=abc'",
                "example.com/m",
            ]
        );
    }
}

//! Command transformation applied after flag assembly: on most platforms
//! this is the identity, but MSVC's compiler only works from inside a
//! developer command prompt, so its environment has to be bootstrapped by
//! wrapping the invocation in a call to `vcvarsall.bat`.

use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::toolchain::CommandSpec;
use crate::util::process::ProcessBuilder;

/// Rewrites a `CommandSpec` before it is handed to `ProcessBuilder`.
pub trait CommandTransformer: Send + Sync {
    fn transform(&self, spec: CommandSpec) -> CommandSpec;
}

/// No-op transformer used for GCC and Clang, where the compiler runs
/// directly without any surrounding environment setup.
pub struct IdentityTransformer;

impl CommandTransformer for IdentityTransformer {
    fn transform(&self, spec: CommandSpec) -> CommandSpec {
        spec
    }
}

/// Wraps an MSVC invocation in `cmd.exe /c "call <vcvarsall> <arch> && ..."`
/// so the compiler sees the INCLUDE/LIB/PATH variables `vcvarsall.bat`
/// would otherwise set up interactively.
pub struct MsvcShimTransformer {
    vcvarsall: PathBuf,
    arch: String,
}

impl MsvcShimTransformer {
    pub fn new(vcvarsall: PathBuf, arch: &str) -> Self {
        MsvcShimTransformer {
            vcvarsall,
            arch: arch.to_string(),
        }
    }

    /// Build one for the current machine by discovering Visual Studio
    /// through `vswhere.exe`.
    pub fn discover(arch: &str) -> Result<Self, BuildError> {
        let vswhere = find_vswhere().ok_or_else(|| BuildError::ToolchainBootstrap {
            reason: "vswhere.exe not found under Program Files (x86)".to_string(),
        })?;
        let vcvarsall = find_vcvarsall(&vswhere)?;
        Ok(MsvcShimTransformer::new(vcvarsall, arch))
    }
}

impl CommandTransformer for MsvcShimTransformer {
    fn transform(&self, spec: CommandSpec) -> CommandSpec {
        let inner = display_invocation(&spec);
        let wrapped = format!(
            "call \"{}\" {} && {}",
            self.vcvarsall.display(),
            self.arch,
            inner
        );
        CommandSpec {
            program: PathBuf::from("cmd.exe"),
            args: vec!["/c".to_string(), wrapped],
            env: spec.env,
        }
    }
}

fn display_invocation(spec: &CommandSpec) -> String {
    let mut parts = vec![format!("\"{}\"", spec.program.display())];
    parts.extend(spec.args.iter().map(|a| {
        if a.contains(' ') {
            format!("\"{a}\"")
        } else {
            a.clone()
        }
    }));
    parts.join(" ")
}

/// Locate `vswhere.exe` under the 32-bit Program Files tree, where the
/// Visual Studio installer always places it regardless of host
/// architecture.
pub fn find_vswhere() -> Option<PathBuf> {
    let pf86 = std::env::var("ProgramFiles(x86)")
        .or_else(|_| std::env::var("PROGRAMFILES(X86)"))
        .ok()?;
    let candidate = Path::new(&pf86)
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");
    candidate.exists().then_some(candidate)
}

/// Query `vswhere.exe` for an installation carrying the C++ build tools
/// component, then resolve its `vcvarsall.bat`.
pub fn find_vcvarsall(vswhere: &Path) -> Result<PathBuf, BuildError> {
    let output = ProcessBuilder::new(vswhere)
        .args([
            "-latest",
            "-products",
            "*",
            "-requires",
            "Microsoft.VisualStudio.Component.VC.Tools.x86.x64",
            "-property",
            "installationPath",
        ])
        .exec_and_check()?;

    let install_path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if install_path.is_empty() {
        return Err(BuildError::ToolchainBootstrap {
            reason: "vswhere found no installation with the VC.Tools.x86.x64 component"
                .to_string(),
        });
    }

    let vcvarsall = Path::new(&install_path)
        .join("VC")
        .join("Auxiliary")
        .join("Build")
        .join("vcvarsall.bat");
    if !vcvarsall.exists() {
        return Err(BuildError::ToolchainBootstrap {
            reason: format!("vcvarsall.bat not found at {}", vcvarsall.display()),
        });
    }
    Ok(vcvarsall)
}

/// Strip the standard developer-prompt banner lines from captured stdout,
/// so callers see only the wrapped command's own output.
pub fn filter_banner(output: &str) -> String {
    output
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !(trimmed.starts_with("Microsoft (R)")
                || trimmed.starts_with("Copyright (C)")
                || trimmed.contains("Developer Command Prompt")
                || trimmed.to_lowercase().contains("vcvarsall.bat"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transformer_is_a_no_op() {
        let spec = CommandSpec {
            program: PathBuf::from("gcc"),
            args: vec!["-c".to_string(), "main.c".to_string()],
            env: Vec::new(),
        };
        let out = IdentityTransformer.transform(spec.clone());
        assert_eq!(out.program, spec.program);
        assert_eq!(out.args, spec.args);
    }

    #[test]
    fn msvc_shim_wraps_invocation_with_vcvarsall_call() {
        let transformer = MsvcShimTransformer::new(PathBuf::from(r"C:\VS\vcvarsall.bat"), "x64");
        let spec = CommandSpec {
            program: PathBuf::from("cl.exe"),
            args: vec!["/c".to_string(), "main.cpp".to_string()],
            env: Vec::new(),
        };
        let out = transformer.transform(spec);
        assert_eq!(out.program, PathBuf::from("cmd.exe"));
        assert_eq!(out.args[0], "/c");
        assert!(out.args[1].contains("vcvarsall.bat"));
        assert!(out.args[1].contains("x64"));
        assert!(out.args[1].contains("cl.exe"));
        assert!(out.args[1].contains("&&"));
    }

    #[test]
    fn filter_banner_removes_known_lines_and_blanks() {
        let raw = "Microsoft (R) C/C++ Optimizing Compiler\n\
                   Copyright (C) Microsoft Corporation\n\
                   \n\
                   \n\
                   [vcvarsall.bat] Environment initialized for: 'x64'\n\
                   main.obj\n";
        let filtered = filter_banner(raw);
        assert_eq!(filtered, "main.obj");
    }
}

//! GCC-family and Clang-family flag assembly. Both families share
//! identical flag syntax, so one implementation serves both; only the
//! `Family` tag they report differs.

use std::path::{Path, PathBuf};

use crate::core::source::BuildProfile;
use crate::manifest::Language;
use crate::toolchain::{ArchiveInput, CommandSpec, CompileInput, Family, LinkInput, Toolchain};

pub struct GccToolchain {
    compiler: PathBuf,
    family: Family,
}

impl GccToolchain {
    pub fn new(compiler: &str, family: Family) -> Self {
        GccToolchain {
            compiler: PathBuf::from(compiler),
            family,
        }
    }

}

fn arch_flag(arch: &str) -> Option<&'static str> {
    match arch {
        "x86" => Some("-m32"),
        "x64" => Some("-m64"),
        _ => None,
    }
}

fn profile_flags(profile: BuildProfile) -> &'static [&'static str] {
    match profile {
        BuildProfile::Debug => &["-g", "-O0"],
        BuildProfile::Release => &["-O3", "-DNDEBUG"],
    }
}

impl Toolchain for GccToolchain {
    fn family(&self) -> Family {
        self.family
    }

    fn compiler_path(&self) -> &Path {
        &self.compiler
    }

    fn archiver_path(&self) -> PathBuf {
        PathBuf::from("ar")
    }

    fn compile(&self, input: &CompileInput) -> CommandSpec {
        let mut args = Vec::new();
        args.push("-c".to_string());
        args.push(input.source.display().to_string());
        args.push("-o".to_string());
        args.push(input.object.display().to_string());

        args.extend(profile_flags(input.profile).iter().map(|s| s.to_string()));
        if let Some(flag) = arch_flag(input.arch) {
            args.push(flag.to_string());
        }
        for dir in input.include_dirs {
            args.push(format!("-I{}", dir.display()));
        }
        for define in input.defines {
            args.push(format!("-D{define}"));
        }

        args.push(format!("-std={}", input.standard));
        args.extend(input.flags.iter().cloned());

        let _ = input.language; // extension dispatch handles C vs C++.

        CommandSpec {
            program: self.compiler.clone(),
            args,
            env: Vec::new(),
        }
    }

    fn archive(&self, input: &ArchiveInput) -> CommandSpec {
        let mut args = vec!["rcs".to_string(), input.output.display().to_string()];
        args.extend(input.objects.iter().map(|o| o.display().to_string()));
        CommandSpec {
            program: self.archiver_path(),
            args,
            env: Vec::new(),
        }
    }

    fn link(&self, input: &LinkInput) -> CommandSpec {
        let mut args = Vec::new();
        args.extend(input.objects.iter().map(|o| o.display().to_string()));
        for dir in input.lib_dirs {
            args.push(format!("-L{}", dir.display()));
        }
        for lib in input.libs {
            args.push(format!("-l{lib}"));
        }
        if let Some(flag) = arch_flag(input.arch) {
            args.push(flag.to_string());
        }
        if input.shared {
            args.push("-shared".to_string());
            args.push("-fPIC".to_string());
        }
        if matches!(input.profile, BuildProfile::Debug) {
            args.push("-g".to_string());
        }
        args.extend(input.flags.iter().cloned());
        args.push("-o".to_string());
        args.push(input.output.display().to_string());

        CommandSpec {
            program: self.compiler.clone(),
            args,
            env: Vec::new(),
        }
    }
}

//! MSVC flag assembly.

use std::path::{Path, PathBuf};

use crate::core::source::BuildProfile;
use crate::manifest::Language;
use crate::toolchain::{ArchiveInput, CommandSpec, CompileInput, Family, LinkInput, Toolchain};

pub struct MsvcToolchain {
    compiler: PathBuf,
}

impl MsvcToolchain {
    pub fn new(compiler: &str) -> Self {
        MsvcToolchain {
            compiler: PathBuf::from(compiler),
        }
    }
}

fn profile_flags(profile: BuildProfile) -> &'static [&'static str] {
    match profile {
        BuildProfile::Debug => &["/Zi", "/Od", "/MDd"],
        BuildProfile::Release => &["/O2", "/DNDEBUG", "/MD"],
    }
}

impl Toolchain for MsvcToolchain {
    fn family(&self) -> Family {
        Family::Msvc
    }

    fn compiler_path(&self) -> &Path {
        &self.compiler
    }

    fn archiver_path(&self) -> PathBuf {
        PathBuf::from("lib")
    }

    fn compile(&self, input: &CompileInput) -> CommandSpec {
        let mut args = vec![
            "/c".to_string(),
            input.source.display().to_string(),
            format!("/Fo:{}", input.object.display()),
        ];

        args.extend(profile_flags(input.profile).iter().map(|s| s.to_string()));
        for dir in input.include_dirs {
            args.push(format!("/I{}", dir.display()));
        }
        for define in input.defines {
            args.push(format!("/D{define}"));
        }

        args.push(format!("/std:{}", input.standard));
        if matches!(input.language, Language::Cxx) {
            args.push("/EHsc".to_string());
        }
        args.extend(input.flags.iter().cloned());

        CommandSpec {
            program: self.compiler.clone(),
            args,
            env: Vec::new(),
        }
    }

    fn archive(&self, input: &ArchiveInput) -> CommandSpec {
        let mut args = vec![format!("/OUT:{}", input.output.display())];
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
            args.push(format!("/LIBPATH:{}", dir.display()));
        }
        for lib in input.libs {
            args.push(format!("{lib}.lib"));
        }
        if input.shared {
            args.push("/LD".to_string());
        }
        if matches!(input.profile, BuildProfile::Debug) {
            args.push("/DEBUG".to_string());
        }
        args.extend(input.flags.iter().cloned());
        args.push(format!("/Fe:{}", input.output.display()));

        CommandSpec {
            program: self.compiler.clone(),
            args,
            env: Vec::new(),
        }
    }
}

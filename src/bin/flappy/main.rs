//! Thin command-line surface over the core build pipeline. Interactive
//! wizards, manifest scaffolding, colored output, and shell completions
//! are external collaborators' concern, not this binary's.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use flappy::builder;
use flappy::core::source::BuildProfile;
use flappy::manifest::MANIFEST_NAME;
use flappy::util::logging;
use flappy::util::process::ProcessBuilder;

#[derive(Parser)]
#[command(name = "flappy")]
#[command(author, version, about = "A build system and package manager for C/C++ projects", long_about = None)]
struct Cli {
    /// Build in release mode instead of debug.
    #[arg(long, global = true)]
    release: bool,

    /// Custom target profile name declared under `[build.<name>]`.
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the project and its dependencies.
    Build,
    /// Build the project and its `[test]` target, then run it.
    Test,
    /// Build the project, then run its executable.
    Run {
        /// Arguments forwarded to the built executable.
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    let mode = if cli.release {
        BuildProfile::Release
    } else {
        BuildProfile::Debug
    };
    let manifest_path = PathBuf::from(MANIFEST_NAME);

    let outcome = match cli.command {
        Command::Build => run_build(&manifest_path, mode, cli.profile.as_deref(), false),
        Command::Test => run_build(&manifest_path, mode, cli.profile.as_deref(), true),
        Command::Run { args } => {
            run_and_execute(&manifest_path, mode, cli.profile.as_deref(), &args)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logging::error("Failed", &err);
            ExitCode::FAILURE
        }
    }
}

fn run_build(
    manifest_path: &Path,
    mode: BuildProfile,
    target_profile: Option<&str>,
    run_tests: bool,
) -> flappy::Result<()> {
    let project = builder::run(manifest_path, mode, target_profile, run_tests)?;
    if let Some(tests) = &project.tests {
        logging::action("Running", tests.output.display());
        let status = ProcessBuilder::new(&tests.output).status()?;
        if !status.success() {
            std::process::exit(status.code().unwrap_or(1));
        }
    }
    Ok(())
}

fn run_and_execute(
    manifest_path: &Path,
    mode: BuildProfile,
    target_profile: Option<&str>,
    args: &[String],
) -> flappy::Result<()> {
    let project = builder::run(manifest_path, mode, target_profile, false)?;
    logging::action("Running", project.main.output.display());
    let status = ProcessBuilder::new(&project.main.output)
        .args(args)
        .status()?;
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

//! Command dispatch and handler modules.

mod clean_dep;
mod clean_dep_mgt;

use std::path::{Path, PathBuf};

use miette::Result;

use pomclean_core::config::{CleanConfig, ConfigOverrides};
use pomclean_core::CONFIG_FILE_NAME;
use pomclean_util::errors::PomcleanError;
use pomclean_util::fs::nearest_dir_containing;

use crate::cli::{Cli, Command};

/// A command with its POM and effective configuration, ready to run.
pub struct Invocation {
    operation: Operation,
    pom_path: PathBuf,
    pub config: CleanConfig,
}

enum Operation {
    CleanDep,
    CleanDepMgt,
}

/// Resolve the POM and configuration for a parsed CLI invocation.
pub fn prepare(cli: Cli) -> Result<Invocation> {
    let verbose = cli.verbose.then_some(true);
    let (operation, overrides) = match cli.command {
        Command::CleanDep {
            output_directory,
            output_file_name,
            fail_on_warning,
            ignore_non_compile,
            report,
            analyze_command,
        } => (
            Operation::CleanDep,
            ConfigOverrides {
                output_directory,
                output_file_name,
                fail_on_warning,
                verbose,
                ignore_non_compile: ignore_non_compile.then_some(true),
                report,
                analyze_command,
                ..ConfigOverrides::default()
            },
        ),
        Command::CleanDepMgt {
            output_file_name,
            fail_build,
        } => (
            Operation::CleanDepMgt,
            ConfigOverrides {
                output_file_name,
                fail_build: fail_build.then_some(true),
                verbose,
                ..ConfigOverrides::default()
            },
        ),
    };
    let (pom_path, config) = load_config(&cli.file, overrides)?;
    Ok(Invocation {
        operation,
        pom_path,
        config,
    })
}

/// Route a prepared invocation to its command handler.
pub fn run(invocation: Invocation) -> Result<()> {
    let Invocation {
        operation,
        pom_path,
        config,
    } = invocation;
    match operation {
        Operation::CleanDep => clean_dep::exec(&pom_path, &config),
        Operation::CleanDepMgt => clean_dep_mgt::exec(&pom_path, &config),
    }
}

/// Check that `file` is a POM and load the configuration that applies to
/// it: the nearest `pomclean.toml` in its directory or above, with
/// `overrides` on top.
fn load_config(file: &Path, overrides: ConfigOverrides) -> Result<(PathBuf, CleanConfig)> {
    if !file.is_file() {
        return Err(PomcleanError::Manifest {
            message: format!("No POM found at {}", file.display()),
        }
        .into());
    }
    let pom_path = file.canonicalize().map_err(PomcleanError::Io)?;
    let pom_dir = pom_path.parent().unwrap_or_else(|| Path::new("."));
    let mut config = match nearest_dir_containing(pom_dir, CONFIG_FILE_NAME) {
        Some(dir) => CleanConfig::load(&dir)?,
        None => CleanConfig::default(),
    };
    config.apply(overrides);
    Ok((pom_path, config))
}

//! CLI argument definitions for pomclean.
//!
//! Each command corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pomclean",
    version,
    about = "Prune unused dependencies from Maven POMs",
    long_about = "pomclean removes unused declared dependencies, declares used but undeclared \
                  ones, and prunes dependency management entries no module uses. The result \
                  is written to a clean POM next to the build output; the project POM is \
                  never modified."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// List every change made
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project POM
    #[arg(short, long, global = true, default_value = "pom.xml")]
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove unused and add used-but-undeclared dependencies
    CleanDep {
        /// Directory for the clean POM [default: the build directory]
        #[arg(long)]
        output_directory: Option<PathBuf>,
        /// File name of the clean POM [default: clean.pom.xml]
        #[arg(long)]
        output_file_name: Option<String>,
        /// Fail when the clean POM cannot be written [default: true]
        #[arg(long, value_name = "BOOL")]
        fail_on_warning: Option<bool>,
        /// Keep unused dependencies whose scope is not compile
        #[arg(long)]
        ignore_non_compile: bool,
        /// Dependency analysis report (JSON or a dependency:analyze log)
        #[arg(long, conflicts_with = "analyze_command")]
        report: Option<PathBuf>,
        /// Command that prints dependency:analyze output
        #[arg(long)]
        analyze_command: Option<String>,
    },

    /// Remove dependency management entries no governed module uses
    CleanDepMgt {
        /// File name of the clean POM [default: clean.pom.xml]
        #[arg(long)]
        output_file_name: Option<String>,
        /// Fail when a clean POM cannot be written
        #[arg(long)]
        fail_build: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_clean_dep_options() {
        let cli = Cli::try_parse_from([
            "pomclean",
            "-f",
            "app/pom.xml",
            "clean-dep",
            "--fail-on-warning",
            "false",
            "--ignore-non-compile",
        ])
        .unwrap();
        assert_eq!(cli.file, PathBuf::from("app/pom.xml"));
        match cli.command {
            Command::CleanDep {
                fail_on_warning,
                ignore_non_compile,
                report,
                ..
            } => {
                assert_eq!(fail_on_warning, Some(false));
                assert!(ignore_non_compile);
                assert!(report.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn report_conflicts_with_analyze_command() {
        let result = Cli::try_parse_from([
            "pomclean",
            "clean-dep",
            "--report",
            "a.json",
            "--analyze-command",
            "mvn dependency:analyze",
        ]);
        assert!(result.is_err());
    }
}

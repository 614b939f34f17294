use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all pomclean operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PomcleanError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed POM file.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check the pom.xml for well-formed XML"))]
    Manifest { message: String },

    /// Dependency usage analysis could not be performed.
    #[error("Cannot analyze dependencies: {message}")]
    #[diagnostic(help("Run `mvn dependency:analyze` or pass --report with an analysis report"))]
    Analysis { message: String },

    /// Invalid pomclean.toml or option combination.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Warnings were raised and the fail-fast switch is on.
    #[error("{message}")]
    DependencyProblems { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PomcleanResult<T> = miette::Result<T>;

use pomclean_util::errors::PomcleanError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = PomcleanError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_manifest_error_display() {
    let err = PomcleanError::Manifest {
        message: "unexpected end of file".to_string(),
    };
    assert_eq!(err.to_string(), "Manifest error: unexpected end of file");
}

#[test]
fn test_analysis_error_display() {
    let err = PomcleanError::Analysis {
        message: "report not found".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Cannot analyze dependencies: report not found"
    );
}

#[test]
fn test_config_error_display() {
    let err = PomcleanError::Config {
        message: "bad key".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: bad key");
}

#[test]
fn test_dependency_problems_display_is_bare_message() {
    let err = PomcleanError::DependencyProblems {
        message: "Dependency problems found".to_string(),
    };
    assert_eq!(err.to_string(), "Dependency problems found");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: PomcleanError = io_err.into();
    assert!(matches!(err, PomcleanError::Io(_)));
}

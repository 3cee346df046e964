//! Logging Tests

use recs_domain::error::Error;
use recs_infrastructure::constants::{DEFAULT_LOG_LEVEL, LOG_MAX_FILES};
use recs_infrastructure::logging::{LoggingConfig, init_logging, parse_log_level};
use tempfile::TempDir;
use tracing::Level;

#[test]
fn test_parse_log_level() {
    assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
    assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
    assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
    assert_eq!(parse_log_level("warn").unwrap(), Level::WARN);
    assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
    assert_eq!(parse_log_level("error").unwrap(), Level::ERROR);

    assert!(matches!(
        parse_log_level("verbose"),
        Err(Error::Configuration { .. })
    ));
}

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, DEFAULT_LOG_LEVEL);
    assert!(!config.json_format);
    assert!(config.file_output.is_none());
    assert_eq!(config.max_files, LOG_MAX_FILES);
}

// The global subscriber can be installed once per process, so every
// init_logging scenario lives in this single test.
#[test]
fn test_init_logging_writes_rolled_file() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        level: "debug".to_string(),
        file_output: Some(dir.path().join("engine.log")),
        ..LoggingConfig::default()
    };

    let invalid = LoggingConfig {
        level: "loud".to_string(),
        ..config.clone()
    };
    assert!(init_logging(&invalid).is_err());

    init_logging(&config).unwrap();
    tracing::info!("after init");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        names
            .iter()
            .any(|name| name.starts_with("engine") && name.ends_with(".log")),
        "{names:?}"
    );

    // a second subscriber is refused
    assert!(init_logging(&config).is_err());
}

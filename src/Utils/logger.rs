use crate::Utils::config::{ConfigError, LoggingConfig};
use log::warn;
use simplelog::*;
use std::fs::File;

/// Console and/or file logging as set in the `[logging]` section.
///
/// Returns whether a logger was installed; a second call, or a config with neither
/// console nor file output, installs nothing. An unwritable log file is reported with a
/// warning on the console, or as `ConfigError::Io` when there is no console to warn on.
pub fn init_logger(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let level = config.level_filter()?;

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    // Console logger
    if config.console {
        loggers.push(TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }

    // File logger
    let mut file_failure = None;
    if let Some(path) = config.log_file_path() {
        match File::create(&path) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(err) if loggers.is_empty() => return Err(ConfigError::Io(err)),
            Err(err) => file_failure = Some((path, err)),
        }
    }

    if loggers.is_empty() {
        return Ok(false);
    }
    let installed = CombinedLogger::init(loggers).is_ok();
    if let Some((path, err)) = file_failure {
        warn!("cannot open log file {}: {}, file logging is off", path.display(), err);
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logger(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unwritable_file_without_console_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            console: false,
            file: Some(dir.path().join("missing").join("riemann.log")),
            timestamp: false,
            ..LoggingConfig::default()
        };
        assert!(matches!(init_logger(&config), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_no_outputs_installs_nothing() {
        let config = LoggingConfig {
            console: false,
            file: None,
            ..LoggingConfig::default()
        };
        assert_eq!(init_logger(&config).unwrap(), false);
    }
}

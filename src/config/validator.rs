use crate::config::{EmulatorConfig, StartupConfig};
use crate::error::{Error, Result};
use reqwest::Url;

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ConfigInvalid(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

/// Validates the download URL
pub fn validate_download_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| Error::ConfigInvalid(format!("Invalid download URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::ConfigInvalid(format!(
            "Download URL must use http or https, got '{}'",
            other
        ))),
    }
}

/// Validates the readiness and shutdown policy
pub fn validate_startup_config(startup: &StartupConfig) -> Result<()> {
    require_non_empty("startup.readinessMarker", &startup.readiness_marker)?;

    if startup.startup_timeout_ms == 0 {
        return Err(Error::ConfigInvalid(
            "'startup.startupTimeoutMs' must be greater than zero".to_string(),
        ));
    }

    if startup.shutdown_timeout_ms == 0 {
        return Err(Error::ConfigInvalid(
            "'startup.shutdownTimeoutMs' must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates the port the emulator is asked to listen on
pub fn validate_port(port: u16) -> Result<()> {
    // The emulator never reports the port it picked, so it has to be explicit.
    if port == 0 {
        return Err(Error::ConfigInvalid("Port must be non-zero".to_string()));
    }
    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &EmulatorConfig) -> Result<()> {
    require_non_empty("java", &config.java)?;
    require_non_empty("archiveName", &config.archive_name)?;
    require_non_empty("extractDir", &config.extract_dir)?;
    require_non_empty("jarName", &config.jar_name)?;

    if config.install_dir.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("'installDir' must not be empty".to_string()));
    }

    validate_download_url(&config.download_url)?;
    validate_startup_config(&config.startup)?;

    Ok(())
}

/*!
 # DynamoDB Local Runner

 A Rust library for running a local DynamoDB emulator from tests.

 ## Overview

 DynamoDB Local Runner provides functionality to:
 - Download and unpack the DynamoDB Local archive on first use
 - Reuse the unpacked emulator on every later run
 - Launch it with `java -jar` and wait until it reports readiness
 - Stop it and wait until the process has exited

 ## Basic Usage

 ```no_run
 use dynamodb_local_runner::{DynamoDbLocal, Result, config::EmulatorConfig};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Everything is cached below this directory
     let runner = DynamoDbLocal::new(EmulatorConfig::with_install_dir("/tmp/dynamodb-local"))?;

     // Downloads on the first run, then starts the emulator on port 8000
     let server = runner.start(8000).await?;
     println!("Point your client at {}", server.endpoint());

     // Interrupts the emulator and waits for it to exit
     server.stop().await?;
     Ok(())
 }
 ```

 ## Requirements

 A Java runtime must be available, either through `JAVA_HOME` or as `java`
 on `PATH`. The first start needs network access to fetch the archive.

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod config;
pub mod error;
pub mod install;
pub mod server;

pub use config::{EmulatorConfig, StartupConfig};
pub use error::{Error, Result};
pub use install::{ArchiveFetcher, HttpFetcher, Installer};
pub use server::{LaunchCommand, ServerHandle, ServerStatus};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Provision and run DynamoDB Local
///
/// This struct is the main entry point: it owns a validated configuration
/// and the archive source, and starts emulator processes on demand.
/// All public methods are instrumented with `tracing` spans.
#[derive(Clone)]
pub struct DynamoDbLocal {
    /// Configuration
    config: EmulatorConfig,
    /// Where the archive comes from
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl DynamoDbLocal {
    /// Create a runner from a configuration file path
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = EmulatorConfig::from_file(path)?;
        Self::new(config)
    }

    /// Create a runner from a configuration string
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = EmulatorConfig::parse_from_str(config)?;
        Self::new(config)
    }

    /// Create a runner from a configuration
    ///
    /// The configuration is validated; the archive is fetched over HTTP.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config), fields(install_dir = %config.install_dir.display()))]
    pub fn new(config: EmulatorConfig) -> Result<Self> {
        config::validate_config(&config).map_err(|e| {
            tracing::error!(error = %e, "Invalid configuration");
            e
        })?;

        tracing::debug!("Creating new DynamoDbLocal runner");
        Ok(Self {
            config,
            fetcher: Arc::new(HttpFetcher::default()),
        })
    }

    /// Replace the archive source
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Installer bound to this runner's configuration and archive source
    pub fn installer(&self) -> Installer {
        Installer::with_fetcher(self.config.clone(), Arc::clone(&self.fetcher))
    }

    /// Make sure the emulator is on disk and return the jar path
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_installed(&self) -> Result<PathBuf> {
        self.installer().ensure_installed().await
    }

    /// Start DynamoDB Local on `port`
    ///
    /// Installs the emulator if needed, launches it and waits for the
    /// readiness marker (see [`server::spawn`] for the timeout policy).
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, port: u16) -> Result<ServerHandle> {
        config::validator::validate_port(port)?;

        let jar = self.ensure_installed().await?;
        let command = LaunchCommand::emulator(&self.config, &jar, port);
        tracing::debug!(%command, "Launching DynamoDB Local");

        server::spawn(&command, port, &self.config.startup)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to start DynamoDB Local");
                e
            })
    }
}

/// Start DynamoDB Local on `port` with the default configuration
///
/// Equivalent to `DynamoDbLocal::new(EmulatorConfig::default())?.start(port)`.
pub async fn start(port: u16) -> Result<ServerHandle> {
    DynamoDbLocal::new(EmulatorConfig::default())?.start(port).await
}

//! Provisioning of the DynamoDB Local emulator.
//!
//! The emulator ships as a zip archive holding `DynamoDBLocal.jar` and its
//! native libraries. The installer downloads that archive once, keeps it in
//! the install directory and unpacks it next to it. Later runs find the jar
//! and skip both steps.
//!
//! # Components
//!
//! * `download` - The `ArchiveFetcher` seam and its HTTP implementation
//! * `extract` - Zip extraction into the install directory
//!
//! # Examples
//!
//! ```no_run
//! use dynamodb_local_runner::config::EmulatorConfig;
//! use dynamodb_local_runner::install::Installer;
//!
//! #[tokio::main]
//! async fn main() -> dynamodb_local_runner::Result<()> {
//!     let installer = Installer::new(EmulatorConfig::with_install_dir("/tmp/ddb"));
//!     let jar = installer.ensure_installed().await?;
//!     println!("Emulator jar at {}", jar.display());
//!     Ok(())
//! }
//! ```
mod download;
mod extract;

pub use download::{ArchiveFetcher, HttpFetcher};
pub use extract::{extract_archive, extract_archive_blocking};

use crate::config::EmulatorConfig;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// One lock per install directory, shared by every installer in the process.
static INSTALL_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
    OnceLock::new();

fn install_lock(install_dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
    let locks = INSTALL_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut locks = locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(locks.entry(install_dir.to_path_buf()).or_default())
}

async fn remove_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Install(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Downloads and unpacks the emulator when it is not already on disk.
#[derive(Clone)]
pub struct Installer {
    config: EmulatorConfig,
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl Installer {
    /// Creates an installer that downloads over HTTP.
    pub fn new(config: EmulatorConfig) -> Self {
        Self::with_fetcher(config, Arc::new(HttpFetcher::default()))
    }

    /// Creates an installer with a custom archive source.
    pub fn with_fetcher(config: EmulatorConfig, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Get the configuration
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Whether the emulator jar is already present.
    pub async fn is_installed(&self) -> bool {
        is_file(&self.config.jar_path()).await
    }

    /// Makes sure the emulator jar exists and returns its path.
    ///
    /// A cached archive is reused; only a missing archive triggers a download.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The install directory cannot be created
    /// * The download or extraction fails
    /// * The archive does not contain the configured jar
    #[tracing::instrument(skip(self), fields(install_dir = %self.config.install_dir.display()))]
    pub async fn ensure_installed(&self) -> Result<PathBuf> {
        let jar = self.config.jar_path();
        if is_file(&jar).await {
            tracing::debug!(jar = %jar.display(), "DynamoDB Local already installed");
            return Ok(jar);
        }

        let lock = install_lock(&self.config.install_dir);
        let _guard = lock.lock().await;

        // Another installer may have finished while we waited.
        if is_file(&jar).await {
            tracing::debug!(jar = %jar.display(), "DynamoDB Local installed concurrently");
            return Ok(jar);
        }

        tracing::info!("No DynamoDB Local jar found. Downloading it for testing purposes");
        tokio::fs::create_dir_all(&self.config.install_dir)
            .await
            .map_err(|e| {
                Error::Install(format!(
                    "Failed to create install directory {}: {}",
                    self.config.install_dir.display(),
                    e
                ))
            })?;

        let archive = self.config.archive_path();
        if is_file(&archive).await {
            tracing::info!("{} already exists. Trying to unzip it", archive.display());
        } else {
            self.download(&archive).await?;
        }

        self.unpack(&archive).await?;

        tracing::info!(jar = %jar.display(), "DynamoDB Local installed");
        Ok(jar)
    }

    /// Extracts into a staging directory and moves it into place only once
    /// it holds the jar, so the final directory is never half-written.
    async fn unpack(&self, archive: &Path) -> Result<()> {
        let extract_path = self.config.extract_path();
        let staging = extract::partial_path(&extract_path);
        remove_dir(&staging).await?;

        if let Err(e) = extract_archive(archive, &staging).await {
            let _ = remove_dir(&staging).await;
            // The cached archive is most likely corrupt; fetch it again next time.
            let _ = tokio::fs::remove_file(archive).await;
            tracing::error!(error = %e, "Failed to unpack DynamoDB Local");
            return Err(e);
        }

        if !is_file(&staging.join(&self.config.jar_name)).await {
            let _ = remove_dir(&staging).await;
            return Err(Error::Install(format!(
                "Archive {} does not contain {}",
                archive.display(),
                self.config.jar_name
            )));
        }

        remove_dir(&extract_path).await?;
        tokio::fs::rename(&staging, &extract_path)
            .await
            .map_err(|e| {
                Error::Install(format!(
                    "Failed to move {} to {}: {}",
                    staging.display(),
                    extract_path.display(),
                    e
                ))
            })
    }

    async fn download(&self, archive: &Path) -> Result<()> {
        let partial = extract::partial_path(archive);

        match self.fetcher.fetch(&self.config.download_url, &partial).await {
            Ok(bytes) => tracing::debug!(bytes, "Archive fetched"),
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                tracing::error!(error = %e, "Failed to download DynamoDB Local");
                return Err(e);
            }
        }

        tokio::fs::rename(&partial, archive).await.map_err(|e| {
            Error::Download(format!(
                "Failed to move {} to {}: {}",
                partial.display(),
                archive.display(),
                e
            ))
        })
    }
}

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// How often download progress is logged.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Source of the emulator archive.
///
/// The installer only talks to this trait, so tests can count or fake
/// downloads without touching the network.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetches `url` and writes the body to `dest`, returning the number of
    /// bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Fetches the archive over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    progress_interval: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    #[tracing::instrument(skip(self), fields(dest = %dest.display()))]
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::info!("Downloading from {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Download(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!(
                "{} answered with HTTP {}",
                url, status
            )));
        }

        let total = response.content_length();
        match total {
            Some(total) => tracing::info!("Zip file size: {:6.2}M", bytes_to_mb(total)),
            None => tracing::info!("Zip file size unknown"),
        }

        tracing::info!("Write zip file to {}", dest.display());
        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            Error::Download(format!("Failed to create {}: {}", dest.display(), e))
        })?;

        let mut written: u64 = 0;
        let mut last_report = Instant::now();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Download(format!("Failed to read body from {}: {}", url, e)))?
        {
            file.write_all(&chunk).await.map_err(|e| {
                Error::Download(format!("Failed to write {}: {}", dest.display(), e))
            })?;
            written += chunk.len() as u64;

            if last_report.elapsed() >= self.progress_interval {
                match total {
                    Some(total) => tracing::info!(
                        "Downloading... {:6.2}M/{:6.2}M",
                        bytes_to_mb(written),
                        bytes_to_mb(total)
                    ),
                    None => tracing::info!("Downloading... {:6.2}M", bytes_to_mb(written)),
                }
                last_report = Instant::now();
            }
        }

        file.flush()
            .await
            .map_err(|e| Error::Download(format!("Failed to flush {}: {}", dest.display(), e)))?;

        tracing::debug!(bytes = written, "Download finished");
        Ok(written)
    }
}

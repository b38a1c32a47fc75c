use assert_fs::TempDir;
use assert_fs::prelude::*;
use async_trait::async_trait;
use dynamodb_local_runner::config::EmulatorConfig;
use dynamodb_local_runner::error::{Error, Result};
use dynamodb_local_runner::install::{ArchiveFetcher, Installer};
use dynamodb_local_runner::DynamoDbLocal;
use mockall::mock;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zip::write::SimpleFileOptions;

const URL: &str = "https://downloads.example.com/dynamodb_local_latest.zip";

mock! {
    pub Fetcher {}

    #[async_trait]
    impl ArchiveFetcher for Fetcher {
        async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
    }
}

/// Builds an archive laid out like the published DynamoDB Local zip.
fn emulator_zip(include_jar: bool) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    if include_jar {
        writer.start_file("DynamoDBLocal.jar", options).unwrap();
        writer.write_all(b"fake jar").unwrap();
    }
    writer.add_directory("DynamoDBLocal_lib/", options).unwrap();
    writer
        .start_file("DynamoDBLocal_lib/sqlite4java.jar", options)
        .unwrap();
    writer.write_all(b"fake lib").unwrap();
    writer.start_file("README.txt", options).unwrap();
    writer.write_all(b"DynamoDB Local").unwrap();

    writer.finish().unwrap().into_inner()
}

/// Serves an archive slowly and counts how often it was asked to.
struct SlowFetcher {
    archive: Vec<u8>,
    fetches: AtomicUsize,
}

#[async_trait]
impl ArchiveFetcher for SlowFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> Result<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::fs::write(dest, &self.archive).await.unwrap();
        Ok(self.archive.len() as u64)
    }
}

fn config_in(dir: &TempDir) -> EmulatorConfig {
    let mut config = EmulatorConfig::with_install_dir(dir.path());
    config.download_url = URL.to_string();
    config
}

fn serving(archive: Vec<u8>, times: usize) -> MockFetcher {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_fetch()
        .times(times)
        .returning(move |url, dest| {
            assert_eq!(url, URL);
            std::fs::write(dest, &archive).unwrap();
            Ok(archive.len() as u64)
        });
    fetcher
}

#[tokio::test]
async fn test_downloads_once_and_reuses_cache() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let installer = Installer::with_fetcher(config.clone(), Arc::new(serving(emulator_zip(true), 1)));

    assert!(!installer.is_installed().await);

    let jar = installer.ensure_installed().await?;
    assert_eq!(jar, config.jar_path());
    assert_eq!(std::fs::read(&jar).unwrap(), b"fake jar");
    assert!(config.extract_path().join("DynamoDBLocal_lib/sqlite4java.jar").is_file());
    assert!(config.archive_path().is_file());
    assert!(!dir.path().join("dynamodb_local_latest.zip.part").exists());

    // Second run finds the jar and never calls the fetcher again.
    let again = installer.ensure_installed().await?;
    assert_eq!(again, jar);
    assert!(installer.is_installed().await);

    Ok(())
}

#[tokio::test]
async fn test_cached_archive_is_extracted_without_download() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    dir.child("dynamodb_local_latest.zip")
        .write_binary(&emulator_zip(true))
        .unwrap();

    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().never();
    let installer = Installer::with_fetcher(config.clone(), Arc::new(fetcher));

    let jar = installer.ensure_installed().await?;

    assert_eq!(jar, config.jar_path());
    assert!(jar.is_file());
    Ok(())
}

#[tokio::test]
async fn test_failed_download_leaves_nothing_cached() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(1).returning(|_, dest| {
        std::fs::write(dest, b"truncated").unwrap();
        Err(Error::Download("connection reset".to_string()))
    });
    let installer = Installer::with_fetcher(config.clone(), Arc::new(fetcher));

    let result = installer.ensure_installed().await;

    assert!(matches!(result, Err(Error::Download(_))));
    assert!(!config.archive_path().exists());
    assert!(!dir.path().join("dynamodb_local_latest.zip.part").exists());
    assert!(!config.jar_path().exists());
}

#[tokio::test]
async fn test_archive_without_jar_is_an_install_error() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let installer = Installer::with_fetcher(config, Arc::new(serving(emulator_zip(false), 1)));

    let result = installer.ensure_installed().await;

    assert!(matches!(result, Err(Error::Install(_))));
}

#[tokio::test]
async fn test_runner_uses_its_fetcher() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let runner = DynamoDbLocal::new(config_in(&dir))?
        .with_fetcher(Arc::new(serving(emulator_zip(true), 1)));

    let jar = runner.ensure_installed().await?;
    assert!(jar.ends_with("dynamodb-local/DynamoDBLocal.jar"));

    runner.ensure_installed().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_installs_download_once() -> Result<()> {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(SlowFetcher {
        archive: emulator_zip(true),
        fetches: AtomicUsize::new(0),
    });
    let first = Installer::with_fetcher(config_in(&dir), fetcher.clone());
    let second = Installer::with_fetcher(config_in(&dir), fetcher.clone());

    let (a, b) = tokio::join!(first.ensure_installed(), second.ensure_installed());

    assert_eq!(a?, b?);
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    assert!(first.is_installed().await);
    Ok(())
}

#[tokio::test]
async fn test_interrupted_extraction_is_not_installed() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    // The jar unpacks fine, the entry after it does not.
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("DynamoDBLocal.jar", options).unwrap();
    writer.write_all(b"fake jar").unwrap();
    writer.start_file("../escaped.txt", options).unwrap();
    writer.write_all(b"bad entry").unwrap();
    let archive = writer.finish().unwrap().into_inner();

    let installer = Installer::with_fetcher(config.clone(), Arc::new(serving(archive, 1)));

    let result = installer.ensure_installed().await;

    assert!(matches!(result, Err(Error::Extract(_))));
    assert!(!installer.is_installed().await);
    assert!(!config.extract_path().exists());
    assert!(!dir.path().join("dynamodb-local.part").exists());
    // The broken archive is dropped so the next run fetches a fresh one.
    assert!(!config.archive_path().exists());
}

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Archive published by AWS for the latest DynamoDB Local release.
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://s3-us-west-2.amazonaws.com/dynamodb-local/dynamodb_local_latest.zip";

/// File name the downloaded archive is cached under.
pub const DEFAULT_ARCHIVE_NAME: &str = "dynamodb_local_latest.zip";

/// Directory, relative to the install directory, the archive is unpacked into.
pub const DEFAULT_EXTRACT_DIR: &str = "dynamodb-local";

/// Jar whose presence marks a complete install.
pub const DEFAULT_JAR_NAME: &str = "DynamoDBLocal.jar";

/// Substring DynamoDB Local prints on stdout once it accepts connections.
pub const DEFAULT_READINESS_MARKER: &str =
    "Initializing DynamoDB Local with the following configuration";

/// Environment variable overriding the default install directory.
pub const INSTALL_DIR_ENV: &str = "DYNAMODB_LOCAL_DIR";

/// Readiness and shutdown policy for a single emulator process.
///
/// # Examples
///
/// ```
/// use dynamodb_local_runner::config::StartupConfig;
/// use std::time::Duration;
///
/// let startup = StartupConfig {
///     startup_timeout_ms: 30_000,
///     fail_on_timeout: true,
///     ..StartupConfig::default()
/// };
/// assert_eq!(startup.startup_timeout(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartupConfig {
    /// Substring searched for in every stdout line of the child.
    pub readiness_marker: String,

    /// How long `start` waits for the readiness marker, in milliseconds.
    pub startup_timeout_ms: u64,

    /// Treat a missing readiness marker as an error instead of logging it.
    ///
    /// When `false` the handle is returned after the timeout even though the
    /// marker was never seen.
    pub fail_on_timeout: bool,

    /// How long `stop` waits after the interrupt before killing the process,
    /// in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl StartupConfig {
    /// Startup timeout as a `Duration`.
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Shutdown timeout as a `Duration`.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            readiness_marker: DEFAULT_READINESS_MARKER.to_string(),
            startup_timeout_ms: 10_000,
            fail_on_timeout: false,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Configuration for provisioning and launching DynamoDB Local.
///
/// Every field has a default, so a configuration file only needs to list
/// what it changes.
///
/// # JSON Schema
///
/// ```json
/// {
///   "installDir": "/var/cache/dynamodb-local",
///   "downloadUrl": "https://s3-us-west-2.amazonaws.com/dynamodb-local/dynamodb_local_latest.zip",
///   "java": "/usr/lib/jvm/java-17/bin/java",
///   "jvmArgs": ["-Xmx512m"],
///   "sharedDb": true,
///   "inMemory": true,
///   "extraArgs": ["-delayTransientStatuses"],
///   "env": { "AWS_REGION": "us-east-1" },
///   "startup": {
///     "startupTimeoutMs": 20000,
///     "failOnTimeout": true
///   }
/// }
/// ```
///
/// # Examples
///
/// ```
/// use dynamodb_local_runner::config::EmulatorConfig;
/// use std::path::PathBuf;
///
/// let config = EmulatorConfig {
///     install_dir: PathBuf::from("/tmp/dynamodb-local"),
///     ..EmulatorConfig::default()
/// };
/// assert!(config.jar_path().ends_with("dynamodb-local/DynamoDBLocal.jar"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmulatorConfig {
    /// Directory holding the cached archive and the unpacked emulator.
    pub install_dir: PathBuf,

    /// URL the archive is fetched from when it is not cached.
    pub download_url: String,

    /// File name of the cached archive inside `install_dir`.
    pub archive_name: String,

    /// Sub-directory of `install_dir` the archive is unpacked into.
    pub extract_dir: String,

    /// Jar launched with `java -jar`, relative to the extract directory.
    pub jar_name: String,

    /// Java launcher. Either an absolute path or a command on `PATH`.
    pub java: String,

    /// JVM flags placed before `-jar`.
    pub jvm_args: Vec<String>,

    /// Use a single database file regardless of credentials and region.
    pub shared_db: bool,

    /// Keep all data in memory.
    pub in_memory: bool,

    /// Emulator flags appended after `-port`.
    pub extra_args: Vec<String>,

    /// Environment variables added to the child environment.
    pub env: HashMap<String, String>,

    /// Readiness and shutdown policy.
    pub startup: StartupConfig,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            extract_dir: DEFAULT_EXTRACT_DIR.to_string(),
            jar_name: DEFAULT_JAR_NAME.to_string(),
            java: default_java(),
            jvm_args: Vec::new(),
            shared_db: true,
            in_memory: true,
            extra_args: Vec::new(),
            env: HashMap::new(),
            startup: StartupConfig::default(),
        }
    }
}

impl EmulatorConfig {
    /// Creates the default configuration rooted at `install_dir`.
    pub fn with_install_dir(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or does not conform
    /// to the expected schema.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Path of the cached archive.
    pub fn archive_path(&self) -> PathBuf {
        self.install_dir.join(&self.archive_name)
    }

    /// Directory the archive is unpacked into.
    pub fn extract_path(&self) -> PathBuf {
        self.install_dir.join(&self.extract_dir)
    }

    /// Path of the emulator jar.
    pub fn jar_path(&self) -> PathBuf {
        self.extract_path().join(&self.jar_name)
    }
}

/// Resolves the install directory used when none is configured.
///
/// Order: `DYNAMODB_LOCAL_DIR`, the user cache directory, the temp directory.
pub fn default_install_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(INSTALL_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("dynamodb-local")
}

fn default_java() -> String {
    match std::env::var_os("JAVA_HOME").filter(|v| !v.is_empty()) {
        Some(home) => PathBuf::from(home)
            .join("bin")
            .join("java")
            .to_string_lossy()
            .into_owned(),
        None => "java".to_string(),
    }
}

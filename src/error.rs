/// Error handling module for DynamoDB Local Runner.
///
/// This module defines the error types used throughout the library.
/// Every operation returns these errors to the caller instead of aborting,
/// so test code decides for itself whether a failure is fatal.
///
/// # Example
///
/// ```
/// use dynamodb_local_runner::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Emulator ready"),
///         Err(Error::Download(msg)) => println!("Could not fetch the emulator: {}", msg),
///         Err(Error::Process(msg)) => println!("Emulator process failed: {}", msg),
///         Err(Error::Timeout(msg)) => println!("Emulator did not become ready: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the dynamodb-local-runner library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration file cannot be read
    /// - The configuration JSON is malformed
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - A required string field is empty
    /// - The download URL is not an http(s) URL
    /// - A timeout or the port is zero
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Fetching the emulator archive failed.
    ///
    /// This error occurs when:
    /// - The HTTP request cannot be sent
    /// - The server answers with a non-success status
    /// - The body cannot be written to the install directory
    #[error("Download error: {0}")]
    Download(String),

    /// Unpacking the emulator archive failed.
    ///
    /// This error occurs when:
    /// - The archive is not a valid zip file
    /// - An entry name escapes the destination directory
    /// - A file cannot be written
    #[error("Extract error: {0}")]
    Extract(String),

    /// The install directory does not hold a usable emulator.
    #[error("Install error: {0}")]
    Install(String),

    /// Error when starting, signalling or waiting for the emulator process.
    ///
    /// This error occurs when:
    /// - The Java launcher cannot be spawned
    /// - The process exits before printing the readiness marker
    /// - The process cannot be signalled
    #[error("Server process error: {0}")]
    Process(String),

    /// The readiness marker did not appear in time and the configuration
    /// asks for that to be treated as a failure.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The watcher task is gone without reporting an exit status.
    #[error("Not running")]
    NotRunning,
}

/// Result type for dynamodb-local-runner operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Configuration module for DynamoDB Local Runner.
//!
//! This module handles parsing, defaults and validation of the settings
//! used to provision and launch the emulator. Configurations can be built
//! in code or loaded from JSON files and strings.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use dynamodb_local_runner::config::EmulatorConfig;
//!
//! let config = EmulatorConfig::from_file("dynamodb-local.json").unwrap();
//! println!("Installing into {}", config.install_dir.display());
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use dynamodb_local_runner::config::{EmulatorConfig, validate_config};
//!
//! let mut config = EmulatorConfig::with_install_dir("/tmp/dynamodb-local");
//! config.jvm_args.push("-Xmx256m".to_string());
//! validate_config(&config).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::{
    DEFAULT_ARCHIVE_NAME, DEFAULT_DOWNLOAD_URL, DEFAULT_EXTRACT_DIR, DEFAULT_JAR_NAME,
    DEFAULT_READINESS_MARKER, EmulatorConfig, INSTALL_DIR_ENV, StartupConfig,
    default_install_dir,
};
pub use validator::validate_config;

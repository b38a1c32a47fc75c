// src/server/process.rs
use crate::config::EmulatorConfig;
use crate::error::{Error, Result};
use async_process::{Child, Command, Stdio};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory inside the extracted archive holding the native SQLite libraries.
const NATIVE_LIB_DIR: &str = "DynamoDBLocal_lib";

/// A fully resolved command line for the emulator process.
///
/// `LaunchCommand::emulator` builds the usual `java -jar DynamoDBLocal.jar`
/// invocation. Any other program can be launched through `new`, which is
/// how the supervisor is exercised without a Java runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Extra environment variables, combined with the current environment.
    pub env: HashMap<String, String>,
    /// Working directory of the child, if not inherited.
    pub current_dir: Option<PathBuf>,
}

impl LaunchCommand {
    /// Create a command for an arbitrary program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            current_dir: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build the Java command line that runs DynamoDB Local from `jar` on `port`.
    ///
    /// The working directory is the directory holding the jar, so the
    /// emulator finds its native libraries the same way it does when run by hand.
    pub fn emulator(config: &EmulatorConfig, jar: &Path, port: u16) -> Self {
        let jar_dir = jar
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.extract_path());

        let mut command = Self::new(config.java.clone())
            .args(config.jvm_args.iter().cloned())
            .arg(format!(
                "-Djava.library.path={}",
                jar_dir.join(NATIVE_LIB_DIR).display()
            ))
            .arg("-jar")
            .arg(jar.display().to_string());

        if config.shared_db {
            command = command.arg("-sharedDb");
        }
        if config.in_memory {
            command = command.arg("-inMemory");
        }

        command = command
            .arg("-port")
            .arg(port.to_string())
            .args(config.extra_args.iter().cloned());

        command.env = config.env.clone();
        command.current_dir = Some(jar_dir);
        command
    }

    /// Start the process with stdout piped and stderr passed through
    pub(crate) fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env);

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        command.spawn().map_err(|e| {
            Error::Process(format!(
                "Failed to start '{}': {} (is a Java runtime installed and on PATH?)",
                self.program, e
            ))
        })
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

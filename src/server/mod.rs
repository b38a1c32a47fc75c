/// Server management module for DynamoDB Local Runner.
///
/// This module launches the emulator process, watches its output for the
/// readiness marker and supervises it until it is stopped.
/// All public entry points are instrumented with `tracing` spans.
///
/// # Components
///
/// * `process` - Command line construction and process spawning
/// * `watcher` - Background task reading stdout and observing exit
/// * `handle` - The caller-side `ServerHandle` with `stop` and `wait`
///
/// # Examples
///
/// Supervising an arbitrary command that prints the readiness marker:
///
/// ```no_run
/// use dynamodb_local_runner::config::StartupConfig;
/// use dynamodb_local_runner::server::{self, LaunchCommand};
///
/// #[tokio::main]
/// async fn main() -> dynamodb_local_runner::Result<()> {
///     let startup = StartupConfig::default();
///     let command = LaunchCommand::new("sh").arg("-c").arg(format!(
///         "echo '{}'; exec sleep 60",
///         startup.readiness_marker
///     ));
///
///     let handle = server::spawn(&command, 8000, &startup).await?;
///     handle.stop().await?;
///     Ok(())
/// }
/// ```
mod handle;
mod process;
mod watcher;

pub use handle::{ServerHandle, ServerStatus};
pub use process::LaunchCommand;

use crate::config::StartupConfig;
use crate::error::{Error, Result};

/// Starts `command` and waits for it to report readiness.
///
/// Returns once the readiness marker has been seen on stdout or the startup
/// timeout has elapsed. A timeout is only an error when
/// `StartupConfig::fail_on_timeout` is set; otherwise it is logged and the
/// handle is returned anyway.
///
/// # Errors
///
/// Returns an error if:
/// * The process cannot be spawned
/// * The process exits before printing the readiness marker
/// * The marker does not appear in time and `fail_on_timeout` is set
#[tracing::instrument(skip(command, startup), fields(command = %command))]
pub async fn spawn(
    command: &LaunchCommand,
    port: u16,
    startup: &StartupConfig,
) -> Result<ServerHandle> {
    tracing::debug!("Spawning DynamoDB local server");
    let mut child = command.spawn()?;
    let stdout = child.stdout.take().ok_or_else(|| {
        Error::Process("Failed to get stdout pipe from child process".to_string())
    })?;

    let handle = ServerHandle::watch(
        child,
        stdout,
        port,
        startup.readiness_marker.clone(),
        startup.shutdown_timeout(),
    );
    let pid = handle.pid();

    let started =
        tokio::time::timeout(startup.startup_timeout(), handle.wait_until_started()).await;

    match started {
        Ok(Ok(true)) => {
            tracing::info!("DynamoDB local server running on pid {}, port {}", pid, port);
            Ok(handle)
        }
        Ok(Ok(false)) => {
            let status = handle
                .exit_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown status".to_string());
            tracing::error!(pid, %status, "DynamoDB local server exited before becoming ready");
            Err(Error::Process(format!(
                "'{}' exited before becoming ready: {}",
                command.program, status
            )))
        }
        Ok(Err(e)) => Err(e),
        Err(_) if startup.fail_on_timeout => {
            tracing::error!(
                pid,
                timeout = ?startup.startup_timeout(),
                "Timeout waiting for DynamoDB local server to start, killing it"
            );
            handle.kill_and_wait().await?;
            Err(Error::Timeout(format!(
                "readiness marker not seen within {:?}",
                startup.startup_timeout()
            )))
        }
        Err(_) => {
            tracing::warn!(
                pid,
                timeout = ?startup.startup_timeout(),
                "Timeout waiting for DynamoDB local server to start, continuing anyway"
            );
            Ok(handle)
        }
    }
}

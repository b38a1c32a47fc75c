use super::watcher::{self, WatchState};
use crate::error::{Error, Result};
use async_process::{Child, ChildStdout};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// Status of an emulator process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Running, readiness marker not seen yet
    Starting,
    /// Readiness marker seen
    Running,
    /// Process has exited
    Stopped(ExitStatus),
}

/// Caller-side handle to one running DynamoDB Local process.
///
/// The handle owns nothing but a view of the watcher task: the task holds
/// the child, and the handle reads the state it publishes. `stop` consumes
/// the handle. Dropping a handle whose process is still alive kills it.
///
/// # Examples
///
/// ```no_run
/// #[tokio::main]
/// async fn main() -> dynamodb_local_runner::Result<()> {
///     let server = dynamodb_local_runner::start(8000).await?;
///     println!("DynamoDB Local at {} (pid {})", server.endpoint(), server.pid());
///
///     let status = server.stop().await?;
///     println!("exited with {}", status);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ServerHandle {
    pid: u32,
    port: u16,
    state: watch::Receiver<WatchState>,
    kill: Arc<Notify>,
    shutdown_timeout: Duration,
    watcher: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub(crate) fn watch(
        child: Child,
        stdout: ChildStdout,
        port: u16,
        marker: String,
        shutdown_timeout: Duration,
    ) -> Self {
        let pid = child.id();
        let kill = Arc::new(Notify::new());
        let (watcher, state) = watcher::spawn(child, stdout, marker, Arc::clone(&kill));

        Self {
            pid,
            port,
            state,
            kill,
            shutdown_timeout,
            watcher: Some(watcher),
        }
    }

    /// Get the process id
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the port the emulator was asked to listen on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL to point a DynamoDB client at
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Get the current status
    pub fn status(&self) -> ServerStatus {
        let state = *self.state.borrow();
        match (state.exit, state.ready) {
            (Some(status), _) => ServerStatus::Stopped(status),
            (None, true) => ServerStatus::Running,
            (None, false) => ServerStatus::Starting,
        }
    }

    /// Whether the readiness marker has been seen
    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    /// Exit status, if the process has already exited
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.state.borrow().exit
    }

    /// Waits until the marker is seen or the process exits.
    ///
    /// Returns `true` when the marker was seen.
    pub(crate) async fn wait_until_started(&self) -> Result<bool> {
        let mut state = self.state.clone();
        let seen = *state
            .wait_for(|s| s.ready || s.exit.is_some())
            .await
            .map_err(|_| Error::NotRunning)?;
        Ok(seen.ready)
    }

    /// Waits for the process to exit on its own.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotRunning` if the watcher went away without an exit status.
    pub async fn wait(&self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status() {
            return Ok(status);
        }

        let mut state = self.state.clone();
        let exit = state
            .wait_for(|s| s.exit.is_some())
            .await
            .map_err(|_| Error::NotRunning)?
            .exit;
        exit.ok_or(Error::NotRunning)
    }

    /// Stops the emulator and waits until it has exited.
    ///
    /// The process is interrupted first. If it is still alive after the
    /// configured shutdown timeout it is killed. A process that already
    /// exited is not signalled and its status is returned right away.
    #[tracing::instrument(skip(self), fields(pid = self.pid, port = self.port))]
    pub async fn stop(mut self) -> Result<ExitStatus> {
        tracing::info!("Stopping DynamoDB local server");

        if let Some(status) = self.exit_status() {
            tracing::debug!(%status, "DynamoDB local server had already exited");
            self.join_watcher().await;
            return Ok(status);
        }

        self.interrupt()?;

        let status = match tokio::time::timeout(self.shutdown_timeout, self.wait()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.shutdown_timeout,
                    "DynamoDB local server ignored the interrupt, killing it"
                );
                self.kill.notify_one();
                self.wait().await?
            }
        };

        self.join_watcher().await;
        Ok(status)
    }

    /// Kills the process without interrupting it first and waits for the exit.
    pub(crate) async fn kill_and_wait(mut self) -> Result<ExitStatus> {
        self.kill.notify_one();
        let status = self.wait().await?;
        self.join_watcher().await;
        Ok(status)
    }

    async fn join_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            if let Err(e) = watcher.await {
                tracing::warn!(error = %e, "Watcher task ended abnormally");
            }
        }
    }

    #[cfg(unix)]
    fn interrupt(&self) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let raw = i32::try_from(self.pid)
            .map_err(|_| Error::Process(format!("Pid {} out of range", self.pid)))?;

        match kill(Pid::from_raw(raw), Signal::SIGINT) {
            Ok(()) => Ok(()),
            // Exited between the status check and the signal.
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(Error::Process(format!(
                "Failed to interrupt pid {}: {}",
                self.pid, e
            ))),
        }
    }

    #[cfg(not(unix))]
    fn interrupt(&self) -> Result<()> {
        self.kill.notify_one();
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.exit_status().is_none() {
            tracing::warn!(pid = self.pid, "ServerHandle dropped while running, killing process");
            self.kill.notify_one();
        }
    }
}

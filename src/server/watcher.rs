use async_process::{Child, ChildStdout};
use futures_lite::io::{AsyncBufReadExt, BufReader};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// What the watcher has observed about its child so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WatchState {
    /// The readiness marker appeared on stdout.
    pub ready: bool,
    /// The child exited with this status.
    pub exit: Option<ExitStatus>,
}

/// Spawns the task that owns `child`.
///
/// The task logs every stdout line, flags readiness on the first line
/// containing `marker`, kills the child when `kill` is notified and
/// publishes the exit status once the process is gone. It is the only
/// writer of the returned state.
pub(crate) fn spawn(
    child: Child,
    stdout: ChildStdout,
    marker: String,
    kill: Arc<Notify>,
) -> (JoinHandle<()>, watch::Receiver<WatchState>) {
    let (state_tx, state_rx) = watch::channel(WatchState::default());
    let task = tokio::spawn(watch_child(child, stdout, marker, state_tx, kill));
    (task, state_rx)
}

async fn watch_child(
    mut child: Child,
    stdout: ChildStdout,
    marker: String,
    state: watch::Sender<WatchState>,
    kill: Arc<Notify>,
) {
    let pid = child.id();
    let mut reader = BufReader::new(stdout);
    // Raw bytes: the JVM may log in a non-UTF-8 locale.
    let mut buf = Vec::new();
    let mut killed = false;

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => break,
                Ok(_) => {
                    // A cancelled read leaves its bytes in `buf`; only a
                    // completed read gets here, so `buf` holds one whole line.
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    tracing::debug!(target: "dynamodb_local", pid, "{}", line);
                    if line.contains(marker.as_str()) {
                        state.send_if_modified(|s| !std::mem::replace(&mut s.ready, true));
                    }
                    buf.clear();
                }
                Err(e) => {
                    tracing::warn!(
                        pid,
                        error = %e,
                        "Failed to read emulator output, readiness detection stopped"
                    );
                    break;
                }
            },
            _ = kill.notified(), if !killed => {
                killed = true;
                kill_child(&mut child);
            }
        }
    }

    // Stdout is closed; the process is on its way out or has closed the
    // pipe itself, so a kill request still has to be honoured here.
    let status = tokio::select! {
        status = child.status() => status,
        _ = kill.notified(), if !killed => {
            kill_child(&mut child);
            child.status().await
        }
    };

    match status {
        Ok(status) => {
            tracing::info!(pid, %status, "DynamoDB local server stopped");
            state.send_modify(|s| s.exit = Some(status));
        }
        Err(e) => {
            // Dropping the sender without an exit status surfaces as NotRunning.
            tracing::error!(pid, error = %e, "Failed to wait for DynamoDB local server");
        }
    }
}

fn kill_child(child: &mut Child) {
    tracing::debug!(pid = child.id(), "Killing DynamoDB local server");
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), error = %e, "Failed to kill DynamoDB local server");
    }
}

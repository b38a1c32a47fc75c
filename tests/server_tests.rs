#![cfg(unix)]

use dynamodb_local_runner::config::{DEFAULT_READINESS_MARKER, StartupConfig};
use dynamodb_local_runner::error::{Error, Result};
use dynamodb_local_runner::server::{self, LaunchCommand, ServerStatus};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::time::{Duration, Instant};

/// A shell script standing in for the emulator.
fn script(body: &str) -> LaunchCommand {
    LaunchCommand::new("sh").arg("-c").arg(body)
}

fn marker_line() -> String {
    format!("echo '{}: port 8000'", DEFAULT_READINESS_MARKER)
}

fn startup(startup_timeout_ms: u64, shutdown_timeout_ms: u64) -> StartupConfig {
    StartupConfig {
        startup_timeout_ms,
        shutdown_timeout_ms,
        ..StartupConfig::default()
    }
}

fn is_alive(pid: u32) -> bool {
    !matches!(kill(Pid::from_raw(pid as i32), None), Err(Errno::ESRCH))
}

#[tokio::test]
async fn test_start_waits_for_marker_and_stop_interrupts() -> Result<()> {
    let command = script(&format!(
        "echo 'Loading...'; sleep 0.2; {}; exec sleep 30",
        marker_line()
    ));

    let started = Instant::now();
    let handle = server::spawn(&command, 8000, &startup(5_000, 5_000)).await?;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(handle.is_ready());
    assert_eq!(handle.status(), ServerStatus::Running);
    assert_eq!(handle.port(), 8000);
    assert_eq!(handle.endpoint(), "http://localhost:8000");

    let pid = handle.pid();
    assert!(is_alive(pid));

    let status = handle.stop().await?;

    assert!(!status.success());
    assert!(!is_alive(pid));
    Ok(())
}

#[tokio::test]
async fn test_stop_blocks_until_exit() -> Result<()> {
    // The trap delays the exit so stop has something to wait for.
    let command = script(&format!(
        "trap 'sleep 0.5; exit 0' INT; {}; while true; do sleep 0.1; done",
        marker_line()
    ));
    let handle = server::spawn(&command, 8001, &startup(5_000, 10_000)).await?;
    let pid = handle.pid();

    let started = Instant::now();
    let status = handle.stop().await?;

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(status.success());
    assert!(!is_alive(pid));
    Ok(())
}

#[tokio::test]
async fn test_stop_after_exit_does_not_hang() -> Result<()> {
    let command = script(&format!("{}; exit 3", marker_line()));
    let handle = server::spawn(&command, 8002, &startup(5_000, 5_000)).await?;

    let status = handle.wait().await?;
    assert_eq!(status.code(), Some(3));
    assert_eq!(handle.status(), ServerStatus::Stopped(status));

    let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("stop on an exited process must return promptly")?;
    assert_eq!(stopped.code(), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_stop_kills_when_interrupt_is_ignored() -> Result<()> {
    let command = script(&format!("trap '' INT; {}; exec sleep 30", marker_line()));
    let handle = server::spawn(&command, 8003, &startup(5_000, 300)).await?;
    let pid = handle.pid();

    let started = Instant::now();
    let status = handle.stop().await?;

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(!status.success());
    assert!(!is_alive(pid));
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_tolerated_by_default() -> Result<()> {
    let command = script("echo 'still warming up'; exec sleep 30");

    let started = Instant::now();
    let handle = server::spawn(&command, 8004, &startup(200, 5_000)).await?;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(!handle.is_ready());
    assert_eq!(handle.status(), ServerStatus::Starting);

    handle.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_timeout_fails_when_configured() {
    let command = script("exec sleep 30");
    let mut config = startup(200, 5_000);
    config.fail_on_timeout = true;

    let result = server::spawn(&command, 8005, &config).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[tokio::test]
async fn test_exit_before_ready_is_an_error() {
    let command = script("echo 'Could not bind port' >&2; exit 1");

    let started = Instant::now();
    let result = server::spawn(&command, 8006, &startup(5_000, 5_000)).await;

    assert!(matches!(result, Err(Error::Process(_))));
    // Fails as soon as the process is gone instead of sitting out the timeout.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_marker_after_non_utf8_output() -> Result<()> {
    // \351 is a Latin-1 e-acute, invalid on its own in UTF-8.
    let command = script(&format!(
        "printf 'Caf\\351 loaded\\n'; {}; exec sleep 30",
        marker_line()
    ));

    let started = Instant::now();
    let handle = server::spawn(&command, 8010, &startup(2_000, 5_000)).await?;

    assert!(handle.is_ready());
    assert!(started.elapsed() < Duration::from_secs(2));

    handle.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_custom_marker() -> Result<()> {
    let command = script("echo 'listening'; exec sleep 30");
    let config = StartupConfig {
        readiness_marker: "listening".to_string(),
        ..startup(5_000, 5_000)
    };

    let handle = server::spawn(&command, 8007, &config).await?;

    assert!(handle.is_ready());
    handle.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_missing_program() {
    let command = LaunchCommand::new("definitely-not-a-java-runtime");

    let result = server::spawn(&command, 8008, &StartupConfig::default()).await;

    assert!(matches!(result, Err(Error::Process(_))));
}

#[tokio::test]
async fn test_dropping_handle_kills_process() -> Result<()> {
    let command = script(&format!("{}; exec sleep 30", marker_line()));
    let handle = server::spawn(&command, 8009, &startup(5_000, 5_000)).await?;
    let pid = handle.pid();

    drop(handle);

    let deadline = Instant::now() + Duration::from_secs(5);
    while is_alive(pid) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!is_alive(pid));
    Ok(())
}

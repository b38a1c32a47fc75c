use dynamodb_local_runner::DynamoDbLocal;
use dynamodb_local_runner::config::EmulatorConfig;
use dynamodb_local_runner::error::Result;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG=dynamodb_local=debug also shows the emulator's own output.
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let runner = match std::env::var("DYNAMODB_LOCAL_CONFIG") {
        Ok(path) => DynamoDbLocal::from_config_file(path)?,
        Err(_) => DynamoDbLocal::new(EmulatorConfig::default())?,
    };

    tracing::info!("Starting DynamoDB Local on port {}", port);
    let server = runner.start(port).await?;
    println!("DynamoDB Local listening at {} (pid {})", server.endpoint(), server.pid());
    println!("Press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
    }

    let status = server.stop().await?;
    println!("DynamoDB Local exited with {}", status);
    Ok(())
}

//! Echo bot
//!
//! Listens for unread messages and posts every message body back to the
//! conversation it came from. Stops on Ctrl-C.
//!
//! Run with: cargo run --example echo
//!
//! Set `RUST_LOG=keybot=debug` to watch the round trips, and
//! `KEYBOT_CLI_PATH` to use a backend executable outside `PATH`.

use keybot::ChatClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = ChatClient::from_env().await?;
    let mut messages = client.listen();
    let stop = messages.cancellation_token();

    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "ctrl-c handler failed");
        }
        stop.cancel();
    });

    while let Some(message) = messages.recv().await {
        tracing::info!("{}: {}", message.username(), message.body());
        client.send(message.conversation(), message.body()).await?;
    }

    messages.join().await?;
    client.shutdown().await?;
    Ok(())
}

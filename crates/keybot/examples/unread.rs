//! Unread summary
//!
//! Counts unread messages across all conversations without marking any of
//! them read.
//!
//! Run with: cargo run --example unread

use keybot::ChatClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let client = ChatClient::from_env().await?;

    let conversations = client.get_conversations().await?;
    let mut message_count = 0;
    for conversation in &conversations {
        message_count += client.get_messages(conversation, true).await?.len();
    }

    println!(
        "You have {} unread message(s) from {} conversation(s)",
        message_count,
        conversations.len()
    );

    client.shutdown().await?;
    Ok(())
}

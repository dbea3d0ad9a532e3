//! Library root for `trigger-bot`.
//!
//! Trigger-bot watches Slack channels for configured trigger phrases and answers them:
//! - Matches messages against exact, regex, and fuzzy triggers, first registered wins
//! - Rate-limits each trigger per user with a cooldown window
//! - Delivers the response by DM, falling back to a private thread and then a public notice
//!
//! The bot integrates with Slack for chat and with a JSON file or SurrealDB for storage.
//! The architecture is built around extensible traits that allow for different
//! implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod engine;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the trigger-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the trigger store, cooldowns, and chat client
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting trigger-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}

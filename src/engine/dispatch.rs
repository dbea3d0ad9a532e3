//! Response delivery.
//!
//! A response goes out through the first step of the fallback chain that works:
//! 1. a direct message,
//! 2. a private thread in the originating channel,
//! 3. a public notice in the originating channel asking the user to open their DMs.
//!
//! The public notice never carries the response itself.

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    base::types::{InboundMessage, OutcomeKind, ResponseStats, Trigger},
    service::chat::ChatClient,
};

/// Posted publicly when neither private route works.
pub const PUBLIC_FALLBACK_NOTICE: &str =
    "I tried to send you a DM with helpful information, but it seems your DMs are closed. Please enable DMs from server members to receive help.";

/// A step of the fallback chain that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("direct message failed: {0}")]
    DirectMessage(String),
    #[error("private thread failed: {0}")]
    PrivateThread(String),
    #[error("public reply failed: {0}")]
    PublicReply(String),
}

/// What happened to one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: OutcomeKind,
    /// The failed steps, in the order they were tried.
    pub errors: Vec<DeliveryError>,
}

/// Delivers trigger responses and counts how each delivery ended.
pub struct ResponseDispatcher {
    chat: ChatClient,
    stats: Mutex<ResponseStats>,
}

impl ResponseDispatcher {
    pub fn new(chat: ChatClient) -> Self {
        Self {
            chat,
            stats: Mutex::new(ResponseStats::default()),
        }
    }

    /// A copy of the running totals.
    pub fn stats(&self) -> ResponseStats {
        *self.stats.lock()
    }

    /// Sends the trigger's response for the message, falling back as needed.
    ///
    /// Never fails: every step's error is caught and recorded in the report, and exactly one
    /// counter is incremented.
    #[instrument(skip_all, fields(trigger = %trigger.id, user = %message.author_id))]
    pub async fn deliver(&self, message: &InboundMessage, trigger: &Trigger) -> DeliveryReport {
        let mut errors = Vec::new();

        let outcome = 'chain: {
            match self.chat.send_direct_message(&message.author_id, &trigger.response).await {
                Ok(()) => break 'chain OutcomeKind::DmSent,
                Err(e) => {
                    warn!("Failed to send DM: {:#}", e);
                    errors.push(DeliveryError::DirectMessage(format!("{e:#}")));
                }
            }

            let thread_name = format!("Help for {}", display_name(message));

            match self
                .chat
                .send_private_thread_message(&message.channel_id, &message.message_id, &message.author_id, &thread_name, &trigger.response)
                .await
            {
                Ok(()) => break 'chain OutcomeKind::ThreadFallback,
                Err(e) => {
                    warn!("Failed to create thread: {:#}", e);
                    errors.push(DeliveryError::PrivateThread(format!("{e:#}")));
                }
            }

            match self.chat.send_public_reply(&message.channel_id, &message.message_id, PUBLIC_FALLBACK_NOTICE).await {
                Ok(()) => OutcomeKind::PublicReply,
                Err(e) => {
                    warn!("Failed to send public reply: {:#}", e);
                    errors.push(DeliveryError::PublicReply(format!("{e:#}")));
                    OutcomeKind::Failure
                }
            }
        };

        self.stats.lock().record(outcome);

        info!("Delivery finished with {:?}.", outcome);

        DeliveryReport { outcome, errors }
    }
}

fn display_name(message: &InboundMessage) -> &str {
    if message.author_name.is_empty() { &message.author_id } else { &message.author_name }
}

// Tests.

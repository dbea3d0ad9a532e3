//! Event handling for trigger-bot.
//!
//! Platform listeners convert their events into an [`InboundMessage`](crate::base::types::InboundMessage)
//! and hand it to [`message::handle_message`].

pub mod message;

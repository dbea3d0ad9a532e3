//! Shared types: result aliases, triggers, messages, and delivery outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Application error type.
pub type Err = anyhow::Error;
/// Application result type.
pub type Res<T> = Result<T, Err>;
/// Application result with no value.
pub type Void = Res<()>;

/// The matching strategy of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Case-insensitive full-string equality.
    Exact,
    /// Case-insensitive regular expression, matched anywhere in the input.
    Regex,
    /// Every pattern word is a substring of some input word.
    Fuzzy,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerKind::Exact => "exact",
            TriggerKind::Regex => "regex",
            TriggerKind::Fuzzy => "fuzzy",
        };

        f.write_str(name)
    }
}

/// A named rule pairing a pattern with a canned response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Unique identifier within the store.
    pub id: String,
    /// The pattern, interpreted according to `kind`.
    pub pattern: String,
    /// The matching strategy (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    /// The canned response sent to the user.
    pub response: String,
}

impl Trigger {
    /// Create a trigger.
    pub fn new(id: impl Into<String>, pattern: impl Into<String>, kind: TriggerKind, response: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            kind,
            response: response.into(),
        }
    }
}

/// The persisted trigger document: `{ "triggers": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDocument {
    /// Triggers in registration order.
    pub triggers: Vec<Trigger>,
}

/// A chat message, stripped down to what the pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform id of the author.
    pub author_id: String,
    /// Display name of the author, best-effort.
    ///
    /// Often empty: Slack only sends a username for bot and integration messages. Consumers
    /// fall back to `author_id`.
    pub author_name: String,
    /// Whether the author is an automated account.
    pub author_is_bot: bool,
    /// Platform id of the originating channel.
    pub channel_id: String,
    /// Platform id of the message (the `ts` on Slack).
    pub message_id: String,
    /// The message text.
    pub text: String,
}

/// Which step of the fallback chain settled a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeKind {
    /// The response went out as a direct message.
    DmSent,
    /// The response went out in a private thread.
    ThreadFallback,
    /// Only the public notice could be posted.
    PublicReply,
    /// Nothing could be posted.
    Failure,
}

/// Running totals of dispatch outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStats {
    /// Deliveries settled by a direct message.
    pub dms_sent: u64,
    /// Deliveries settled by a private thread.
    pub threads_fallback: u64,
    /// Deliveries settled by the public notice.
    pub public_replies: u64,
    /// Deliveries where every step failed.
    pub failures: u64,
}

impl ResponseStats {
    /// Count one delivery.
    pub fn record(&mut self, outcome: OutcomeKind) {
        match outcome {
            OutcomeKind::DmSent => self.dms_sent += 1,
            OutcomeKind::ThreadFallback => self.threads_fallback += 1,
            OutcomeKind::PublicReply => self.public_replies += 1,
            OutcomeKind::Failure => self.failures += 1,
        }
    }

    /// Deliveries counted so far.
    pub fn total(&self) -> u64 {
        self.dms_sent + self.threads_fallback + self.public_replies + self.failures
    }
}

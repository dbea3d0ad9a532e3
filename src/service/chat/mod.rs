pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{base::types::Void, runtime::Runtime};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This is everything the bot needs from a chat platform: a listener to start, and the three
/// ways of getting a response to a user that the dispatcher falls back through.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// This sets up event listeners for the chat platform and hands incoming
    /// messages to the pipeline, together with the given runtime.
    async fn start(&self, runtime: Runtime) -> Void;

    /// Send a direct message to a user.
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Void;

    /// Post a message only the given user can see, in a thread on the given message.
    ///
    /// The thread name is a hint for platforms that name their threads.
    async fn send_private_thread_message(&self, channel_id: &str, message_id: &str, user_id: &str, thread_name: &str, text: &str) -> Void;

    /// Reply publicly to a message in its channel.
    async fn send_public_reply(&self, channel_id: &str, message_id: &str, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}

//! Slack integration for trigger-bot.
//!
//! This module provides the Slack implementation of [`GenericChatClient`]:
//! - Receiving messages over socket mode and handing them to the pipeline
//! - Direct messages, user-only thread messages, and public thread replies
//!
//! Slack threads have no members, so the "private thread" step posts an ephemeral message in
//! the thread of the triggering message, visible only to its author.

use crate::{
    base::{
        config::Config,
        types::{InboundMessage, Res, Void},
    },
    interaction,
    runtime::Runtime,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self::new(Arc::new(client)))
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    runtime: Runtime,
    bot_user_id: String,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        config.validate_slack()?;

        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    async fn start(&self, runtime: Runtime) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            runtime,
            bot_user_id: self.bot_user_id.clone(),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Void {
        let session = self.client.open_session(&self.bot_token);

        // Open (or reuse) the IM channel with the user.

        let open_request = SlackApiConversationsOpenRequest::new().with_users(vec![SlackUserId(user_id.to_string())]);
        let im = session.conversations_open(&open_request).await.map_err(|e| anyhow::anyhow!("Failed to open DM: {}", e))?;

        let message = SlackMessageContent::new().with_text(text.to_string());
        let request = SlackApiChatPostMessageRequest::new(im.channel.id, message);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send DM: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_private_thread_message(&self, channel_id: &str, message_id: &str, user_id: &str, thread_name: &str, text: &str) -> Void {
        debug!("Slack threads are unnamed, ignoring `{}`.", thread_name);

        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostEphemeralRequest::new(SlackChannelId(channel_id.to_string()), SlackUserId(user_id.to_string()), message)
            .with_thread_ts(SlackTs(message_id.to_string()));

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_ephemeral(&request).await.map_err(|e| anyhow::anyhow!("Failed to send thread message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_public_reply(&self, channel_id: &str, message_id: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message)
            .with_thread_ts(SlackTs(message_id.to_string()))
            .with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send public reply: {}", e))?;

        Ok(())
    }
}

// Event conversion.

/// Converts a Slack message event into an [`InboundMessage`].
///
/// Returns `None` for events that are not new messages (edits, deletions, and the like) or that
/// carry no channel or author.
fn to_inbound_message(event: &SlackMessageEvent, bot_user_id: &str) -> Option<InboundMessage> {
    let from_bot_subtype = match &event.subtype {
        None => false,
        Some(SlackMessageEventType::BotMessage) => true,
        Some(_) => return None,
    };

    let channel_id = event.origin.channel.as_ref()?.0.clone();
    let text = event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();

    let author_id = match (&event.sender.user, &event.sender.bot_id) {
        (Some(user), _) => user.0.clone(),
        (None, Some(bot)) => bot.0.clone(),
        (None, None) => return None,
    };

    let author_is_bot = from_bot_subtype || event.sender.bot_id.is_some() || author_id == bot_user_id;

    Some(InboundMessage {
        // Only bot and integration messages carry a username.
        author_name: event.sender.username.clone().unwrap_or_default(),
        author_id,
        author_is_bot,
        channel_id,
        message_id: event.origin.ts.0.clone(),
        text,
    })
}

// Socket mode listener callbacks for Slack.

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            debug!("Received message event ...");

            match to_inbound_message(&slack_message_event, &user_state.bot_user_id) {
                Some(message) => interaction::message::handle_message(message, user_state.runtime.clone()),
                None => debug!("Skipping message event that is not a new message."),
            }
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.

//! Runtime services and shared state for the trigger-bot.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{Instrument, debug, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{ResponseStats, Res, Void},
    },
    engine::{cooldown::CooldownTracker, dispatch::ResponseDispatcher, store::TriggerStore},
    service::{chat::ChatClient, db::DbClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the clients, and the engine components.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The trigger set.
    pub triggers: Arc<TriggerStore>,
    /// Per-user, per-trigger cooldowns.
    pub cooldowns: Arc<CooldownTracker>,
    /// Response delivery and its statistics.
    pub dispatcher: Arc<ResponseDispatcher>,
}

/// A point-in-time summary of the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStats {
    #[serde(flatten)]
    pub responses: ResponseStats,
    /// Triggers currently registered.
    pub total_triggers: usize,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the trigger persistence.
        let db = DbClient::from_config(&config).await?;

        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        Ok(Self::with_clients(config, db, chat).await)
    }

    /// Create a runtime around existing clients.
    pub async fn with_clients(config: Config, db: DbClient, chat: ChatClient) -> Self {
        let triggers = Arc::new(TriggerStore::open(db).await);
        let cooldowns = Arc::new(CooldownTracker::new(config.cooldown_window()));
        let dispatcher = Arc::new(ResponseDispatcher::new(chat.clone()));

        Self {
            config,
            chat,
            triggers,
            cooldowns,
            dispatcher,
        }
    }

    /// Response totals plus the trigger count.
    pub fn stats(&self) -> BotStats {
        BotStats {
            responses: self.dispatcher.stats(),
            total_triggers: self.triggers.len(),
        }
    }

    /// Start the cooldown sweeper and listen for chat events until shutdown.
    pub async fn start(&self) -> Void {
        self.spawn_cooldown_sweeper();

        self.chat.start(self.clone()).await
    }

    /// Periodically drops expired cooldowns and logs the running totals.
    fn spawn_cooldown_sweeper(&self) {
        let runtime = self.clone();
        let period = Duration::from_secs(self.config.cooldown_prune_interval_secs);

        tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(period);

                // The first tick completes immediately.
                interval.tick().await;

                loop {
                    interval.tick().await;

                    let pruned = runtime.cooldowns.prune_expired();
                    debug!("Pruned {} expired cooldowns.", pruned);

                    info!("Stats: {}", serde_json::to_string(&runtime.stats()).unwrap_or_default());
                }
            }
            .in_current_span(),
        );
    }
}

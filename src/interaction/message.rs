//! The inbound message pipeline.
//!
//! filter → match → cooldown → random delay → deliver.

use std::time::Duration;

use rand::Rng;
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{config::Config, types::InboundMessage},
    engine::dispatch::DeliveryReport,
    runtime::Runtime,
};

/// Why a message was dropped before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotAuthor,
    IgnoredChannel,
}

/// Where a message left the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Ignored(IgnoreReason),
    NoMatch,
    /// The author already set off this trigger within the window. Nothing is sent.
    OnCooldown { trigger_id: String },
    Dispatched { trigger_id: String, report: DeliveryReport },
}

/// Handles an inbound message on its own task.
#[instrument(skip_all)]
pub fn handle_message(message: InboundMessage, runtime: Runtime) {
    tokio::spawn(
        async move {
            let outcome = handle_message_internal(&message, &runtime).await;

            if let PipelineOutcome::Dispatched { report, .. } = &outcome {
                for err in &report.errors {
                    error!("Delivery step failed: {}", err);
                }
            }
        }
        .in_current_span(),
    );
}

/// Runs one message through the pipeline.
#[instrument(skip_all, fields(user = %message.author_id, channel = %message.channel_id))]
pub async fn handle_message_internal(message: &InboundMessage, runtime: &Runtime) -> PipelineOutcome {
    if message.author_is_bot {
        debug!("Skipping message from a bot.");
        return PipelineOutcome::Ignored(IgnoreReason::BotAuthor);
    }

    if runtime.config.is_ignored_channel(&message.channel_id) {
        debug!("Skipping message in an ignored channel.");
        return PipelineOutcome::Ignored(IgnoreReason::IgnoredChannel);
    }

    let Some(trigger) = runtime.triggers.find_match(&message.text) else {
        return PipelineOutcome::NoMatch;
    };

    if !runtime.cooldowns.try_set_cooldown(&message.author_id, &trigger.id) {
        debug!("Trigger `{}` is on cooldown for this user.", trigger.id);
        return PipelineOutcome::OnCooldown { trigger_id: trigger.id };
    }

    info!("Message matched trigger `{}`.", trigger.id);

    tokio::time::sleep(response_delay(&runtime.config)).await;

    let report = runtime.dispatcher.deliver(message, &trigger).await;

    PipelineOutcome::Dispatched { trigger_id: trigger.id, report }
}

/// A uniformly random delay within the configured bounds.
pub fn response_delay(config: &Config) -> Duration {
    let min = config.response_delay_min_ms;
    let max = config.response_delay_max_ms.max(min);

    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::config::ConfigInner;

    #[test]
    fn test_response_delay_stays_in_bounds() {
        let config = Config::default();

        for _ in 0..100 {
            let delay = response_delay(&config);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_response_delay_can_be_disabled() {
        let config = Config::from(ConfigInner {
            response_delay_min_ms: 0,
            response_delay_max_ms: 0,
            ..Default::default()
        });

        assert_eq!(response_delay(&config), Duration::ZERO);
    }
}

#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use trigger_bot::{
    base::{
        config::{Config, ConfigInner},
        types::{InboundMessage, OutcomeKind, Res, ResponseStats, Trigger, TriggerKind, Void},
    },
    engine::store::LoadOutcome,
    interaction::message::{IgnoreReason, PipelineOutcome, handle_message_internal},
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient},
        db::{DbClient, GenericTriggerDb},
    },
};

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self, runtime: Runtime) -> Void;
        async fn send_direct_message(&self, user_id: &str, text: &str) -> Void;
        async fn send_private_thread_message(&self, channel_id: &str, message_id: &str, user_id: &str, thread_name: &str, text: &str) -> Void;
        async fn send_public_reply(&self, channel_id: &str, message_id: &str, text: &str) -> Void;
    }
}

// Mock trigger persistence for testing.

mock! {
    pub TriggerDb {}

    #[async_trait]
    impl GenericTriggerDb for TriggerDb {
        async fn load_triggers(&self) -> Res<Option<Vec<Trigger>>>;
        async fn save_triggers(&self, triggers: &[Trigger]) -> Void;
    }
}

/// A chat client whose DMs always go through, expecting exactly `dms` of them.
fn get_mock_chat(dms: usize) -> MockChat {
    let mut mock = MockChat::new();

    mock.expect_send_direct_message().times(dms).returning(|_, _| Ok(()));
    mock.expect_send_private_thread_message().never();
    mock.expect_send_public_reply().never();

    mock
}

fn test_config(ignored_channels: Vec<String>) -> Config {
    Config::from(ConfigInner {
        slack_app_token: "xapp-test".to_string(),
        slack_bot_token: "xoxb-test".to_string(),
        ignored_channels,
        response_delay_min_ms: 0,
        response_delay_max_ms: 0,
        ..Default::default()
    })
}

/// Helper function to setup the test environment.
async fn setup_test_environment(chat: MockChat, ignored_channels: Vec<String>) -> Runtime {
    let config = test_config(ignored_channels);

    // Initialize the database (using in-memory for tests).
    let db = DbClient::surreal_memory().await.expect("Failed to create DB client");

    // We create a mocked version of the chat client.
    let chat = ChatClient::new(Arc::new(chat));

    let runtime = Runtime::with_clients(config, db, chat).await;

    runtime.triggers.add(Trigger::new("greet", "hello", TriggerKind::Exact, "Welcome aboard!")).await.expect("Failed to add trigger");
    runtime.triggers.add(Trigger::new("help", "^help", TriggerKind::Regex, "See the docs.")).await.expect("Failed to add trigger");

    runtime
}

fn message(author_id: &str, channel_id: &str, text: &str) -> InboundMessage {
    InboundMessage {
        author_id: author_id.to_string(),
        author_name: "alice".to_string(),
        author_is_bot: false,
        channel_id: channel_id.to_string(),
        message_id: "1700000000.000100".to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_matching_message_dispatches_once_per_window() {
    let runtime = setup_test_environment(get_mock_chat(1), vec![]).await;

    let outcome = handle_message_internal(&message("U1", "C1", "Hello"), &runtime).await;

    let PipelineOutcome::Dispatched { trigger_id, report } = outcome else {
        panic!("Expected a dispatch, got {outcome:?}");
    };
    assert_eq!(trigger_id, "greet");
    assert_eq!(report.outcome, OutcomeKind::DmSent);

    let records = runtime.cooldowns.list_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "U1");
    assert_eq!(records[0].trigger_id, "greet");

    // Same message again, inside the window: silently dropped.
    let outcome = handle_message_internal(&message("U1", "C1", "hello"), &runtime).await;
    assert_eq!(outcome, PipelineOutcome::OnCooldown { trigger_id: "greet".to_string() });

    assert_eq!(runtime.cooldowns.list_all().len(), 1);
    assert_eq!(runtime.dispatcher.stats(), ResponseStats { dms_sent: 1, ..Default::default() });
}

#[tokio::test]
async fn test_cooldown_is_per_user_and_per_trigger() {
    let runtime = setup_test_environment(get_mock_chat(3), vec![]).await;

    assert!(matches!(handle_message_internal(&message("U1", "C1", "hello"), &runtime).await, PipelineOutcome::Dispatched { .. }));
    assert!(matches!(handle_message_internal(&message("U2", "C1", "hello"), &runtime).await, PipelineOutcome::Dispatched { .. }));
    assert!(matches!(handle_message_internal(&message("U1", "C1", "help me"), &runtime).await, PipelineOutcome::Dispatched { .. }));

    assert_eq!(runtime.cooldowns.list_all().len(), 3);
}

#[tokio::test]
async fn test_reset_cooldown_allows_another_dispatch() {
    let runtime = setup_test_environment(get_mock_chat(2), vec![]).await;

    handle_message_internal(&message("U1", "C1", "hello"), &runtime).await;
    assert!(runtime.cooldowns.reset_cooldown("U1", "greet"));

    let outcome = handle_message_internal(&message("U1", "C1", "hello"), &runtime).await;
    assert!(matches!(outcome, PipelineOutcome::Dispatched { .. }));
    assert_eq!(runtime.stats().responses.dms_sent, 2);
}

#[tokio::test]
async fn test_bots_and_ignored_channels_are_skipped() {
    let runtime = setup_test_environment(get_mock_chat(0), vec!["CQUIET".to_string()]).await;

    let mut from_bot = message("B1", "C1", "hello");
    from_bot.author_is_bot = true;

    assert_eq!(handle_message_internal(&from_bot, &runtime).await, PipelineOutcome::Ignored(IgnoreReason::BotAuthor));
    assert_eq!(
        handle_message_internal(&message("U1", "CQUIET", "hello"), &runtime).await,
        PipelineOutcome::Ignored(IgnoreReason::IgnoredChannel)
    );

    assert!(runtime.cooldowns.list_all().is_empty());
}

#[tokio::test]
async fn test_non_matching_message_does_nothing() {
    let runtime = setup_test_environment(get_mock_chat(0), vec![]).await;

    let outcome = handle_message_internal(&message("U1", "C1", "hello there"), &runtime).await;

    assert_eq!(outcome, PipelineOutcome::NoMatch);
    assert!(runtime.cooldowns.list_all().is_empty());
    assert_eq!(runtime.dispatcher.stats().total(), 0);
}

#[tokio::test]
async fn test_full_fallback_through_the_pipeline() {
    let mut chat = MockChat::new();
    chat.expect_send_direct_message().times(1).returning(|_, _| Err(anyhow::anyhow!("cannot_dm_user")));
    chat.expect_send_private_thread_message().times(1).returning(|_, _, _, _, _| Err(anyhow::anyhow!("not_in_channel")));
    chat.expect_send_public_reply().times(1).returning(|_, _, _| Ok(()));

    let runtime = setup_test_environment(chat, vec![]).await;

    let outcome = handle_message_internal(&message("U1", "C1", "help please"), &runtime).await;

    let PipelineOutcome::Dispatched { report, .. } = outcome else {
        panic!("Expected a dispatch, got {outcome:?}");
    };
    assert_eq!(report.outcome, OutcomeKind::PublicReply);
    assert_eq!(report.errors.len(), 2);

    // The cooldown holds even though only the notice went out.
    assert!(runtime.cooldowns.is_on_cooldown("U1", "help"));
}

#[tokio::test]
async fn test_triggers_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triggers.json");

    let first = Runtime::with_clients(test_config(vec![]), DbClient::json_file(&path), ChatClient::new(Arc::new(get_mock_chat(0)))).await;
    assert!(matches!(first.triggers.load_outcome(), LoadOutcome::Missing));

    first.triggers.add(Trigger::new("greet", "hello", TriggerKind::Exact, "Hi!")).await.unwrap();
    first.triggers.add(Trigger::new("fuzzy", "need help", TriggerKind::Fuzzy, "On it.")).await.unwrap();
    first.triggers.remove("greet").await.unwrap();

    let second = Runtime::with_clients(test_config(vec![]), DbClient::json_file(&path), ChatClient::new(Arc::new(get_mock_chat(0)))).await;

    assert!(matches!(second.triggers.load_outcome(), LoadOutcome::Loaded(1)));
    assert_eq!(second.triggers.list(), vec![Trigger::new("fuzzy", "need help", TriggerKind::Fuzzy, "On it.")]);
    assert_eq!(second.triggers.find_match("I really needed some helper").unwrap().id, "fuzzy");
    assert_eq!(second.stats().total_triggers, 1);
}

#[tokio::test]
async fn test_malformed_document_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triggers.json");
    std::fs::write(&path, r#"{ "triggers": "#).unwrap();

    let runtime = Runtime::with_clients(test_config(vec![]), DbClient::json_file(&path), ChatClient::new(Arc::new(get_mock_chat(0)))).await;

    assert!(runtime.triggers.is_empty());
    assert!(matches!(runtime.triggers.load_outcome(), LoadOutcome::Failed(_)));

    // The broken document is left alone until something is written.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{ "triggers": "#);
}

#[tokio::test]
async fn test_save_failure_keeps_store_and_backend_in_step() {
    let mut db = MockTriggerDb::new();
    db.expect_load_triggers().times(1).returning(|| Ok(None));
    db.expect_save_triggers().times(1).returning(|_| Err(anyhow::anyhow!("read-only filesystem")));

    let runtime = Runtime::with_clients(test_config(vec![]), DbClient::new(Arc::new(db)), ChatClient::new(Arc::new(get_mock_chat(0)))).await;

    let result = runtime.triggers.add(Trigger::new("greet", "hello", TriggerKind::Exact, "Hi!")).await;

    assert!(result.is_err());
    assert!(runtime.triggers.is_empty());
    assert_eq!(handle_message_internal(&message("U1", "C1", "hello"), &runtime).await, PipelineOutcome::NoMatch);
}

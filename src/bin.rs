//! Binary entry point for `trigger-bot`.
//!
//! This module provides the command-line interface for trigger-bot with options
//! for configuration file paths and logging verbosity. It either starts the bot or
//! manages the stored triggers.

use clap::{Parser, Subcommand};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};
use trigger_bot::{
    base::{
        config::Config,
        types::{Trigger, TriggerKind, Void},
    },
    engine::store::{LoadOutcome, TriggerStore},
    service::db::DbClient,
};

/// Trigger-bot – answers trigger phrases in Slack with canned responses.
///
/// Configuration can come from `config.toml` or environment variables.
/// The bot watches Slack channels, matches each message against the stored
/// triggers, and sends the matching response to the author, at most once per
/// cooldown window.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// What to do (defaults to `run`).
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to Slack and start answering triggers.
    Run,
    /// Manage the stored triggers.
    ///
    /// A running bot reads the stored triggers once at startup; restart it to pick up changes.
    #[command(subcommand)]
    Trigger(TriggerCommand),
}

/// Printed after a successful write.
const RESTART_NOTICE: &str = "Restart any running trigger-bot to apply the change.";

#[derive(Subcommand, Debug)]
enum TriggerCommand {
    /// Add a new trigger (a running bot sees it after a restart).
    Add {
        /// Unique identifier for the trigger.
        id: String,
        /// The pattern to match messages against.
        pattern: String,
        /// Type of matching to use.
        #[arg(value_enum)]
        kind: TriggerKind,
        /// The response message to send.
        response: String,
    },
    /// Remove a trigger (a running bot drops it after a restart).
    Remove {
        /// ID of the trigger to remove.
        id: String,
    },
    /// List all triggers.
    List,
}

/// Main entry point for the trigger-bot binary.
///
/// Sets up logging based on verbosity, loads configuration, and dispatches the command.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
    let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("trigger-bot");
    let otel = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    let config = Config::load(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => trigger_bot::start(config).await,
        Command::Trigger(command) => manage_triggers(config, command).await,
    }
}

/// Runs a trigger management command against the configured storage.
async fn manage_triggers(config: Config, command: TriggerCommand) -> Void {
    let db = DbClient::from_config(&config).await?;
    let store = TriggerStore::open(db).await;

    // Writing over an unreadable document would replace it with a near-empty one.
    if let LoadOutcome::Failed(err) = store.load_outcome()
        && !matches!(command, TriggerCommand::List)
    {
        return Err(anyhow::anyhow!("Refusing to modify triggers: {}", err));
    }

    match command {
        TriggerCommand::Add { id, pattern, kind, response } => {
            if store.add(Trigger::new(id.clone(), pattern, kind, response)).await? {
                println!("Trigger `{id}` added successfully!");
                println!("{RESTART_NOTICE}");
            } else {
                println!("Failed to add trigger. A trigger with ID `{id}` already exists.");
            }
        }
        TriggerCommand::Remove { id } => {
            if store.remove(&id).await? {
                println!("Trigger `{id}` removed successfully!");
                println!("{RESTART_NOTICE}");
            } else {
                println!("Failed to remove trigger. No trigger with ID `{id}` found.");
            }
        }
        TriggerCommand::List => {
            let triggers = store.list();

            if triggers.is_empty() {
                println!("No triggers are currently configured.");
            }

            for trigger in triggers {
                println!("ID: `{}`, Type: `{}`, Pattern: `{}`", trigger.id, trigger.kind, trigger.pattern);
            }
        }
    }

    Ok(())
}

// Tests.

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_trigger_writes_mention_restart() {
        let mut command = Args::command();
        let trigger = command.find_subcommand_mut("trigger").unwrap();

        for name in ["add", "remove"] {
            let about = trigger.find_subcommand(name).unwrap().get_about().unwrap().to_string();
            assert!(about.contains("restart"), "`trigger {name}` does not mention a restart");
        }

        let args = Args::try_parse_from(["trigger-bot", "trigger", "add", "greet", "hello", "exact", "Hi!"]).unwrap();
        assert!(matches!(args.command, Some(Command::Trigger(TriggerCommand::Add { kind: TriggerKind::Exact, .. }))));
    }
}

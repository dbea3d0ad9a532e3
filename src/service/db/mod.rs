//! Durable storage for the trigger set.
//!
//! The store only needs two things from a backend: read the whole set once at startup, and
//! rewrite the whole set after every change. Backends implement [`GenericTriggerDb`]; the rest
//! of the crate holds a [`DbClient`].

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::base::{
    config::Config,
    types::{Res, Trigger, Void},
};

pub mod json;
pub mod surreal;

// Traits.

/// Generic trigger persistence trait that backends must implement.
#[async_trait]
pub trait GenericTriggerDb: Send + Sync + 'static {
    /// Loads the stored trigger set.
    ///
    /// Returns `None` when nothing has been stored yet, and an error when something is stored
    /// but cannot be read.
    async fn load_triggers(&self) -> Res<Option<Vec<Trigger>>>;

    /// Replaces the stored trigger set with the given one.
    async fn save_triggers(&self, triggers: &[Trigger]) -> Void;
}

// Structs.

/// Database client for trigger-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    inner: Arc<dyn GenericTriggerDb>,
}

impl Deref for DbClient {
    type Target = dyn GenericTriggerDb;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericTriggerDb>) -> Self {
        Self { inner }
    }

    /// Picks the backend named by the configuration.
    ///
    /// SurrealDB when `db_endpoint` is set, otherwise the JSON document at `triggers_path`.
    pub async fn from_config(config: &Config) -> Res<Self> {
        match &config.db_endpoint {
            Some(endpoint) => {
                info!("Storing triggers in SurrealDB at `{}`.", endpoint);
                DbClient::surreal(config).await
            }
            None => {
                info!("Storing triggers in `{}`.", config.triggers_path);
                Ok(DbClient::json_file(&config.triggers_path))
            }
        }
    }
}

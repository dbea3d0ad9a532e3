//! SurrealDB backend for the trigger set.

use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    types::{Res, Trigger, TriggerDocument, Void},
};

use super::{DbClient, GenericTriggerDb};

/// The single record that holds the trigger set.
const TRIGGER_SET: (&str, &str) = ("trigger_set", "default");

impl DbClient {
    /// Creates a SurrealDB client from the configured endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let endpoint = config.db_endpoint.as_deref().ok_or_else(|| anyhow::anyhow!("No database endpoint configured."))?;
        let client = SurrealTriggerDb::connect(endpoint, config).await?;

        Ok(Self::new(Arc::new(client)))
    }

    /// Creates an in-memory SurrealDB client.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealTriggerDb::connect("mem://", &Config::default()).await?;

        Ok(Self::new(Arc::new(client)))
    }
}

/// Stores the trigger set as one record in SurrealDB.
#[derive(Clone)]
pub struct SurrealTriggerDb {
    db: Surreal<Any>,
}

impl SurrealTriggerDb {
    /// Connect, sign in when credentials are configured, and select the namespace and database.
    #[instrument(skip(config))]
    pub async fn connect(endpoint: &str, config: &Config) -> Res<Self> {
        let db = any::connect(endpoint).await?;

        if let (Some(username), Some(password)) = (&config.db_username, &config.db_password) {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(&config.db_namespace).use_db(&config.db_database).await?;

        info!("Database initialized successfully.");

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericTriggerDb for SurrealTriggerDb {
    #[instrument(skip(self))]
    async fn load_triggers(&self) -> Res<Option<Vec<Trigger>>> {
        let document: Option<TriggerDocument> = self.db.select(TRIGGER_SET).await?;

        Ok(document.map(|d| d.triggers))
    }

    #[instrument(skip_all, fields(count = triggers.len()))]
    async fn save_triggers(&self, triggers: &[Trigger]) -> Void {
        let document = TriggerDocument { triggers: triggers.to_vec() };

        let _: Option<TriggerDocument> = self.db.upsert(TRIGGER_SET).content(document).await?;

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::TriggerKind;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let db = DbClient::surreal_memory().await.unwrap();

        assert!(db.load_triggers().await.unwrap().is_none());

        let triggers = vec![Trigger::new("greet", "hello", TriggerKind::Exact, "Hi!")];
        db.save_triggers(&triggers).await.unwrap();
        assert_eq!(db.load_triggers().await.unwrap().unwrap(), triggers);

        db.save_triggers(&[]).await.unwrap();
        assert!(db.load_triggers().await.unwrap().unwrap().is_empty());
    }
}

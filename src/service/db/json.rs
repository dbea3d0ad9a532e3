//! JSON document backend: `{ "triggers": [...] }` on the local filesystem.

use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::base::types::{Res, Trigger, TriggerDocument, Void};

use super::{DbClient, GenericTriggerDb};

impl DbClient {
    /// Creates a client backed by the JSON document at `path`.
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFileTriggerDb::new(path)))
    }
}

/// Stores the trigger set as a single pretty-printed JSON document.
///
/// Writes go to a sibling temp file which is then renamed over the document, so a crash
/// mid-write never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct JsonFileTriggerDb {
    path: PathBuf,
}

impl JsonFileTriggerDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "triggers.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl GenericTriggerDb for JsonFileTriggerDb {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_triggers(&self) -> Res<Option<Vec<Trigger>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read `{}`", self.path.display())),
        };

        let document: TriggerDocument = serde_json::from_str(&raw).with_context(|| format!("Failed to parse `{}`", self.path.display()))?;

        debug!("Read {} triggers.", document.triggers.len());

        Ok(Some(document.triggers))
    }

    #[instrument(skip_all, fields(path = %self.path.display(), count = triggers.len()))]
    async fn save_triggers(&self, triggers: &[Trigger]) -> Void {
        let document = TriggerDocument { triggers: triggers.to_vec() };
        let json = serde_json::to_string_pretty(&document)?;

        let temp = self.temp_path();

        tokio::fs::write(&temp, json).await.with_context(|| format!("Failed to write `{}`", temp.display()))?;
        tokio::fs::rename(&temp, &self.path).await.with_context(|| format!("Failed to replace `{}`", self.path.display()))?;

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::TriggerKind;

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = JsonFileTriggerDb::new(dir.path().join("triggers.json"));

        assert!(db.load_triggers().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let db = JsonFileTriggerDb::new(dir.path().join("triggers.json"));

        let triggers = vec![
            Trigger::new("greet", "hello", TriggerKind::Exact, "Hi!"),
            Trigger::new("help", "^help", TriggerKind::Regex, "Read the docs."),
        ];

        db.save_triggers(&triggers).await.unwrap();

        let loaded = db.load_triggers().await.unwrap().unwrap();
        assert_eq!(loaded, triggers);
        assert!(!db.temp_path().exists());
    }

    #[tokio::test]
    async fn test_written_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triggers.json");
        let db = JsonFileTriggerDb::new(&path);

        db.save_triggers(&[Trigger::new("greet", "hello", TriggerKind::Fuzzy, "Hi!")]).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["triggers"][0]["id"], "greet");
        assert_eq!(value["triggers"][0]["type"], "fuzzy");
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triggers.json");
        std::fs::write(&path, "{ not json").unwrap();

        let db = JsonFileTriggerDb::new(&path);

        assert!(db.load_triggers().await.is_err());
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = JsonFileTriggerDb::new(dir.path().join("nope").join("triggers.json"));

        assert!(db.save_triggers(&[]).await.is_err());
    }
}

//! The trigger store.
//!
//! Holds the trigger set in registration order, keeps it in sync with a [`DbClient`], and
//! evaluates input against it. The first trigger to match wins, so triggers registered earlier
//! take priority.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::{base::types::Trigger, service::db::DbClient};

use super::matcher::{Matcher, PatternError};

/// A failure to talk to the persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to load triggers: {0:#}")]
    Load(anyhow::Error),
    #[error("failed to save triggers: {0:#}")]
    Save(anyhow::Error),
}

/// How the startup load went.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The stored set was read.
    Loaded(usize),
    /// Nothing was stored yet.
    Missing,
    /// The stored set could not be read, so the store started empty.
    Failed(StoreError),
}

/// The result of evaluating an input against every trigger.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// The first trigger that matched.
    pub matched: Option<Trigger>,
    /// Patterns that could not be evaluated before the match was found.
    pub pattern_errors: Vec<PatternError>,
}

#[derive(Debug, Clone)]
struct Entry {
    trigger: Trigger,
    matcher: Matcher,
}

impl Entry {
    fn new(trigger: Trigger) -> Self {
        let matcher = Matcher::for_trigger(&trigger);
        Self { trigger, matcher }
    }
}

/// The set of triggers, in registration order.
///
/// Reads work on a snapshot and never wait on writers. Writers are serialized, and a change only
/// becomes visible once the backend has accepted the new set.
pub struct TriggerStore {
    db: DbClient,
    entries: RwLock<Arc<Vec<Entry>>>,
    write_gate: Mutex<()>,
    load_outcome: LoadOutcome,
}

impl TriggerStore {
    /// Opens the store, reading the stored set once.
    ///
    /// A backend that cannot be read leaves the store empty; the reason is logged and kept in
    /// [`TriggerStore::load_outcome`].
    #[instrument(name = "TriggerStore::open", skip_all)]
    pub async fn open(db: DbClient) -> Self {
        let (triggers, load_outcome) = match db.load_triggers().await {
            Ok(Some(triggers)) => {
                let triggers = dedup(triggers);
                info!("Loaded {} triggers.", triggers.len());
                let count = triggers.len();
                (triggers, LoadOutcome::Loaded(count))
            }
            Ok(None) => {
                info!("No stored triggers found, starting empty.");
                (Vec::new(), LoadOutcome::Missing)
            }
            Err(e) => {
                let err = StoreError::Load(e);
                warn!("{}, starting empty.", err);
                (Vec::new(), LoadOutcome::Failed(err))
            }
        };

        Self {
            db,
            entries: RwLock::new(Arc::new(triggers.into_iter().map(Entry::new).collect())),
            write_gate: Mutex::new(()),
            load_outcome,
        }
    }

    /// How the startup load went.
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    fn snapshot(&self) -> Arc<Vec<Entry>> {
        self.entries.read().clone()
    }

    /// Adds a trigger.
    ///
    /// Returns `Ok(false)` without touching anything when the id is taken. When the backend
    /// rejects the new set, the store is left unchanged and the error is returned.
    #[instrument(skip_all, fields(id = %trigger.id))]
    pub async fn add(&self, trigger: Trigger) -> Result<bool, StoreError> {
        let _gate = self.write_gate.lock().await;
        let current = self.snapshot();

        if current.iter().any(|e| e.trigger.id == trigger.id) {
            info!("Trigger `{}` already exists.", trigger.id);
            return Ok(false);
        }

        let mut next = current.as_ref().clone();
        next.push(Entry::new(trigger));

        self.commit(next).await?;

        Ok(true)
    }

    /// Removes a trigger by id.
    ///
    /// Returns `Ok(false)` when no trigger has that id. Backend failures leave the store unchanged.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _gate = self.write_gate.lock().await;
        let current = self.snapshot();

        if !current.iter().any(|e| e.trigger.id == id) {
            info!("Trigger `{}` not found.", id);
            return Ok(false);
        }

        let next = current.iter().filter(|e| e.trigger.id != id).cloned().collect::<Vec<_>>();

        self.commit(next).await?;

        Ok(true)
    }

    /// Persist `next`, then publish it.
    async fn commit(&self, next: Vec<Entry>) -> Result<(), StoreError> {
        let triggers = next.iter().map(|e| e.trigger.clone()).collect::<Vec<_>>();

        if let Err(e) = self.db.save_triggers(&triggers).await {
            let err = StoreError::Save(e);
            warn!("{}, keeping the previous trigger set.", err);
            return Err(err);
        }

        *self.entries.write() = Arc::new(next);

        Ok(())
    }

    /// A copy of every trigger, in registration order.
    pub fn list(&self) -> Vec<Trigger> {
        self.snapshot().iter().map(|e| e.trigger.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first trigger, in registration order, whose pattern matches the input.
    pub fn find_match(&self, input: &str) -> Option<Trigger> {
        self.evaluate(input).matched
    }

    /// Walks the triggers in registration order until one matches.
    ///
    /// Patterns that cannot be evaluated count as non-matches; they are logged and collected in
    /// the report.
    pub fn evaluate(&self, input: &str) -> MatchReport {
        let mut report = MatchReport::default();

        for entry in self.snapshot().iter() {
            match entry.matcher.matches(input) {
                Ok(true) => {
                    report.matched = Some(entry.trigger.clone());
                    break;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!("{}", err);
                    report.pattern_errors.push(err);
                }
            }
        }

        report
    }
}

/// Keep the first trigger for each id, so a hand-edited document cannot break uniqueness.
fn dedup(triggers: Vec<Trigger>) -> Vec<Trigger> {
    let mut seen = std::collections::HashSet::new();

    triggers
        .into_iter()
        .filter(|t| {
            let fresh = seen.insert(t.id.clone());
            if !fresh {
                warn!("Dropping duplicate stored trigger `{}`.", t.id);
            }
            fresh
        })
        .collect()
}

// Tests.

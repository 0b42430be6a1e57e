//! # Recommendation Orchestrator
//!
//! Entry point for a session:
//! 1. Validate the user and article identifiers
//! 2. Resolve each enabled source's endpoint for those identifiers
//! 3. Mark every enabled source as loading before `submit` returns
//! 4. Start one dispatcher task per enabled source, all at once
//! 5. Hand back a `Submission` the caller may await
//!
//! The tasks do not wait on each other and nothing waits on them internally.
//! A new submission does not cancel fetches that are still running; if two
//! fetches for one source overlap, whichever completes last wins and the
//! source stays loading until both are done.

use std::sync::Arc;

use anyhow::{Context, Result};
use fetch_client::Fetcher;
use serde_json::Value;
use sources::{SourceId, SourcesConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::error::SubmitError;
use crate::state::{RecommendationItem, RecommendationStore, Snapshot};

/// Owns the configured sources, the shared store, and the dispatcher
pub struct RecommendationOrchestrator<T = Value> {
    config: Arc<SourcesConfig>,
    dispatcher: Dispatcher<T>,
}

impl<T> Clone for RecommendationOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<T: RecommendationItem> RecommendationOrchestrator<T> {
    /// Create an orchestrator for `config`, fetching through `fetcher`.
    ///
    /// The configuration is validated here so that the store is built from a
    /// known-good source set.
    pub fn new(config: SourcesConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate().context("Invalid sources configuration")?;

        let store = RecommendationStore::new(&config.source_ids());
        info!(
            "Orchestrator ready: {} sources configured, {} enabled, {} transport",
            config.sources.len(),
            config.enabled().count(),
            fetcher.name()
        );

        Ok(Self {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(fetcher, store),
        })
    }

    pub fn config(&self) -> &SourcesConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn store(&self) -> &RecommendationStore<T> {
        self.dispatcher.store()
    }

    /// Receiver notified on every loading or outcome change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.store().subscribe()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.store().snapshot()
    }

    /// True while any source has a fetch outstanding
    pub fn is_busy(&self) -> bool {
        self.store().any_loading()
    }

    /// Start one fetch per enabled source.
    ///
    /// Blank identifiers are refused before anything is fetched or any
    /// state changes. Identifiers are trimmed before use.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(self))]
    pub fn submit(&self, user_id: &str, article_id: &str) -> Result<Submission, SubmitError> {
        let user_id = user_id.trim();
        let article_id = article_id.trim();
        if user_id.is_empty() || article_id.is_empty() {
            warn!("Rejected submission with a blank identifier");
            return Err(SubmitError::MissingIdentifiers);
        }

        let tasks: Vec<(SourceId, JoinHandle<()>)> = self
            .config
            .enabled()
            .filter_map(|spec| {
                let guard = self.store().begin(spec.name)?;
                let endpoint = spec.resolve(user_id, article_id);
                let dispatcher = self.dispatcher.clone();
                let handle = tokio::spawn(async move {
                    dispatcher.run_with(guard, endpoint).await;
                });
                Some((spec.name, handle))
            })
            .collect();

        info!(
            "Submitted user {} / article {} to {} sources",
            user_id,
            article_id,
            tasks.len()
        );
        Ok(Submission { tasks })
    }

    /// Like [`submit`](Self::submit), but refuses while a previous
    /// submission is still loading.
    pub fn try_submit(&self, user_id: &str, article_id: &str) -> Result<Submission, SubmitError> {
        if self.is_busy() {
            warn!("Rejected submission while fetches are outstanding");
            return Err(SubmitError::Busy);
        }
        self.submit(user_id, article_id)
    }
}

/// Handles to the fetch tasks started by one submission
#[derive(Debug)]
pub struct Submission {
    tasks: Vec<(SourceId, JoinHandle<()>)>,
}

impl Submission {
    /// Sources this submission started a fetch for
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.tasks.iter().map(|(source, _)| *source)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait until every fetch of this submission has recorded its outcome
    pub async fn wait(self) {
        for (source, task) in self.tasks {
            if let Err(e) = task.await {
                warn!("Fetch task for {} ended abnormally: {}", source, e);
            }
        }
    }
}

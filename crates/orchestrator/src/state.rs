//! Shared per-source state and the observable store that publishes it.
//!
//! The store owns one `Snapshot`: a loading flag and a recommendation entry
//! for every configured source. Every write touches exactly one source key.
//! A source stays loading until every fetch started for it has finished.
//! Observers get read-only views through a `tokio::sync::watch` channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sources::SourceId;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Item type a source can yield.
///
/// JSON sources deserialize straight into it; tabular sources build it from
/// each cell's text. The store never looks inside an item.
pub trait RecommendationItem:
    DeserializeOwned + From<String> + Clone + Send + Sync + 'static
{
}

impl<T> RecommendationItem for T where
    T: DeserializeOwned + From<String> + Clone + Send + Sync + 'static
{
}

/// Outcome stored for one source.
///
/// A non-empty `error` always comes with empty `data`. Empty `data` with an
/// empty `error` means the source answered with nothing to recommend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation<T> {
    data: Vec<T>,
    error: String,
}

impl<T> Recommendation<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            error: String::new(),
        }
    }

    pub fn success(data: Vec<T>) -> Self {
        Self {
            data,
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            error: error.into(),
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}

impl<T> Default for Recommendation<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Point-in-time view of every configured source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    loading: BTreeMap<SourceId, bool>,
    recommendations: BTreeMap<SourceId, Recommendation<T>>,
    #[serde(skip)]
    in_flight: BTreeMap<SourceId, usize>,
}

impl<T> Snapshot<T> {
    /// Default state: nothing loading, no data, no error
    pub fn new(sources: &[SourceId]) -> Self {
        Self {
            loading: sources.iter().map(|&id| (id, false)).collect(),
            recommendations: sources
                .iter()
                .map(|&id| (id, Recommendation::empty()))
                .collect(),
            in_flight: sources.iter().map(|&id| (id, 0)).collect(),
        }
    }

    /// Number of fetches for `source` that have started and not finished
    pub fn in_flight(&self, source: SourceId) -> usize {
        self.in_flight.get(&source).copied().unwrap_or(0)
    }

    fn start(&mut self, source: SourceId) {
        if let Some(count) = self.in_flight.get_mut(&source) {
            *count += 1;
        }
        if let Some(flag) = self.loading.get_mut(&source) {
            *flag = true;
        }
    }

    fn finish(&mut self, source: SourceId) {
        let remaining = match self.in_flight.get_mut(&source) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if let Some(flag) = self.loading.get_mut(&source) {
            *flag = remaining > 0;
        }
    }

    pub fn loading(&self) -> &BTreeMap<SourceId, bool> {
        &self.loading
    }

    pub fn recommendations(&self) -> &BTreeMap<SourceId, Recommendation<T>> {
        &self.recommendations
    }

    pub fn get(&self, source: SourceId) -> Option<&Recommendation<T>> {
        self.recommendations.get(&source)
    }

    pub fn is_loading(&self, source: SourceId) -> bool {
        self.loading.get(&source).copied().unwrap_or(false)
    }

    /// True while any source has a fetch outstanding
    pub fn any_loading(&self) -> bool {
        self.loading.values().any(|&loading| loading)
    }

    pub fn contains(&self, source: SourceId) -> bool {
        self.loading.contains_key(&source)
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.loading.keys().copied()
    }
}

/// Owner of the session state.
///
/// Cloning the store hands out another writer to the same state.
pub struct RecommendationStore<T> {
    tx: Arc<watch::Sender<Snapshot<T>>>,
}

impl<T> Clone for RecommendationStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> RecommendationStore<T> {
    pub fn new(sources: &[SourceId]) -> Self {
        let (tx, _rx) = watch::channel(Snapshot::new(sources));
        Self { tx: Arc::new(tx) }
    }

    /// Receiver that is notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }

    pub fn any_loading(&self) -> bool {
        self.tx.borrow().any_loading()
    }

    pub fn is_configured(&self, source: SourceId) -> bool {
        self.tx.borrow().contains(source)
    }

    /// Mark `source` as loading and hand back the guard that finishes it.
    ///
    /// Returns `None` for a source outside the configured set; the store
    /// never gains keys.
    pub fn begin(&self, source: SourceId) -> Option<LoadingGuard<T>> {
        if !self.is_configured(source) {
            warn!(%source, "Ignoring fetch for unconfigured source");
            return None;
        }
        self.tx.send_modify(|snapshot| snapshot.start(source));
        debug!(%source, "Loading started");

        Some(LoadingGuard {
            tx: Arc::clone(&self.tx),
            source,
            finished: false,
        })
    }
}

impl<T: Clone> RecommendationStore<T> {
    /// Copy of the current state
    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }
}

/// Ends one fetch for a source.
///
/// `complete` stores the outcome and ends the fetch in one update; the
/// latest completion's outcome is the one kept. If the guard is dropped
/// without completing (panic, aborted task) only the fetch is ended and the
/// previous outcome stays. The loading flag clears once no fetch for the
/// source is left.
pub struct LoadingGuard<T> {
    tx: Arc<watch::Sender<Snapshot<T>>>,
    source: SourceId,
    finished: bool,
}

impl<T> LoadingGuard<T> {
    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn complete(mut self, outcome: Recommendation<T>) {
        let source = self.source;
        self.tx.send_modify(|snapshot| {
            if let Some(entry) = snapshot.recommendations.get_mut(&source) {
                *entry = outcome;
            }
            snapshot.finish(source);
        });
        self.finished = true;
        debug!(%source, "Loading finished");
    }
}

impl<T> Drop for LoadingGuard<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let source = self.source;
        self.tx.send_modify(|snapshot| snapshot.finish(source));
        warn!(%source, "Fetch ended without an outcome");
    }
}

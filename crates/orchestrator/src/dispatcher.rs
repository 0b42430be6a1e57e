//! # Request Dispatcher
//!
//! Runs one fetch for one source and records the outcome:
//! 1. Mark the source as loading, unless the caller already did
//! 2. GET the endpoint url through the configured `Fetcher`
//! 3. Tabular endpoint: look the row up by key and keep its values
//!    JSON endpoint: keep the array items as they are
//! 4. Store the outcome and clear the loading flag in one update
//!
//! Every failure ends up in the source's entry as a message. Nothing is
//! returned to the caller and no other source is touched.

use std::sync::Arc;

use fetch_client::Fetcher;
use sources::{Endpoint, SourceError, SourceId};
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatchError;
use crate::state::{LoadingGuard, Recommendation, RecommendationItem, RecommendationStore};

/// Performs source fetches against a shared store
pub struct Dispatcher<T> {
    fetcher: Arc<dyn Fetcher>,
    store: RecommendationStore<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            store: self.store.clone(),
        }
    }
}

impl<T: RecommendationItem> Dispatcher<T> {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: RecommendationStore<T>) -> Self {
        Self { fetcher, store }
    }

    pub fn store(&self) -> &RecommendationStore<T> {
        &self.store
    }

    /// Fetch `endpoint` and record the outcome under `source`
    #[instrument(skip(self, source, endpoint), fields(source = %source))]
    pub async fn fetch(&self, source: SourceId, endpoint: Endpoint) {
        let Some(guard) = self.store.begin(source) else {
            return;
        };
        self.run(guard, Ok(endpoint)).await;
    }

    /// Finish a fetch whose loading flag the caller already set through
    /// [`RecommendationStore::begin`]
    #[instrument(skip(self, guard, endpoint), fields(source = %guard.source()))]
    pub async fn run_with(&self, guard: LoadingGuard<T>, endpoint: Endpoint) {
        self.run(guard, Ok(endpoint)).await;
    }

    /// Fetch using the compact `"<url>"` / `"<url> <lookup key>"` form.
    ///
    /// A descriptor that does not parse is recorded as a fetch failure.
    #[instrument(skip(self, source), fields(source = %source))]
    pub async fn fetch_descriptor(&self, source: SourceId, descriptor: &str) {
        let Some(guard) = self.store.begin(source) else {
            return;
        };
        self.run(guard, descriptor.parse()).await;
    }

    async fn run(&self, guard: LoadingGuard<T>, endpoint: Result<Endpoint, SourceError>) {
        let source = guard.source();

        let result = match endpoint {
            Ok(endpoint) => self.retrieve(&endpoint).await,
            Err(e) => Err(DispatchError::from(e)),
        };

        let outcome = match result {
            Ok(data) => {
                info!("Fetched {} recommendations for {}", data.len(), source);
                Recommendation::success(data)
            }
            Err(e) if e.is_not_found() => {
                warn!("No recommendations for {}: {}", source, e);
                Recommendation::failure(e.user_message())
            }
            Err(e) => {
                error!("Error fetching data for {}: {}", source, e);
                Recommendation::failure(e.user_message())
            }
        };

        guard.complete(outcome);
    }

    /// The only suspension point of a fetch is the transport call
    async fn retrieve(&self, endpoint: &Endpoint) -> Result<Vec<T>, DispatchError> {
        debug!(
            "Requesting {} via {} transport",
            endpoint.url(),
            self.fetcher.name()
        );
        let body = self.fetcher.get_text(endpoint.url()).await?;

        match endpoint.lookup_key() {
            Some(lookup_key) => {
                let row = data_loader::extract_row(&body, lookup_key)?;
                Ok(row.into_iter().map(T::from).collect())
            }
            None => Ok(serde_json::from_str::<Vec<T>>(&body)?),
        }
    }
}

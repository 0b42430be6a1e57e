//! Transport for recommendation sources.
//!
//! This crate hides where a source body comes from behind the [`Fetcher`]
//! trait. It handles:
//! - Resolving relative source urls against a base url
//! - Issuing GET requests over HTTP with reqwest
//! - Serving the same paths from a local directory
//! - Turning non-success statuses into errors
//!
//! Retries and caching are deliberately absent: a failed fetch is reported
//! once and the caller decides what to show.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

/// Errors that can occur while fetching a source body
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can GET a url and hand back the body of a successful
/// response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`; a non-success response is an error
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Transport name for logging
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed fetcher.
///
/// No timeout is applied unless one is configured on the builder.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Turn a configured url into an absolute one
    pub fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(url).map_err(|e| FetchError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
                None => Err(FetchError::InvalidUrl {
                    url: url.to_string(),
                    reason: "relative url with no base url configured".to_string(),
                }),
            },
            Err(e) => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let target = self.resolve(url)?;
        debug!("GET {}", target);

        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|source| {
                error!("Request to {} failed: {}", target, source);
                FetchError::Request {
                    url: target.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("{} responded with status {}", target, status);
            return Err(FetchError::Status {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: target.to_string(),
            source,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Builder for [`HttpFetcher`]
#[derive(Debug, Default)]
pub struct HttpFetcherBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpFetcherBuilder {
    /// Base that relative urls are joined onto
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-request timeout applied by the transport
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpFetcher, FetchError> {
        let base_url = self
            .base_url
            .map(|raw| {
                Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
                    url: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;

        info!(
            "HTTP fetcher ready (base url: {}, timeout: {:?})",
            base_url.as_ref().map(Url::as_str).unwrap_or("none"),
            self.timeout
        );
        Ok(HttpFetcher { client, base_url })
    }
}

// ---------------------------------------------------------------------------
// Local directory implementation
// ---------------------------------------------------------------------------

/// Serves source urls from a directory, the way a static dev server would
/// serve `/public/data/*.csv`.
///
/// The query string is ignored and paths may not climb out of the root.
#[derive(Clone, Debug)]
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a url path onto a file under the root
    pub fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let path = match url.strip_prefix("file://") {
            Some(rest) => rest,
            None if url.contains("://") => {
                return Err(invalid("local fetcher only serves paths"));
            }
            None => url,
        };
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));

        if relative.as_os_str().is_empty() {
            return Err(invalid("empty path"));
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(invalid("path escapes the data root"));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let path = self.resolve(url)?;
        debug!("Reading {}", path.display());

        tokio::fs::read_to_string(&path).await.map_err(|source| {
            error!("Failed to read {}: {}", path.display(), source);
            FetchError::Io {
                path: path.display().to_string(),
                source,
            }
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url_ignores_base() {
        let fetcher = HttpFetcher::builder()
            .base_url("http://localhost:5173")
            .build()
            .unwrap();
        let url = fetcher.resolve("https://fake-api.com/azure?userId=1").unwrap();
        assert_eq!(url.as_str(), "https://fake-api.com/azure?userId=1");
    }

    #[test]
    fn test_resolve_relative_url_against_base() {
        let fetcher = HttpFetcher::builder()
            .base_url("http://localhost:5173/app/")
            .build()
            .unwrap();

        let rooted = fetcher.resolve("/public/data/collaborative.csv").unwrap();
        assert_eq!(rooted.as_str(), "http://localhost:5173/public/data/collaborative.csv");

        let relative = fetcher.resolve("public/data/content.csv").unwrap();
        assert_eq!(relative.as_str(), "http://localhost:5173/app/public/data/content.csv");
    }

    #[test]
    fn test_resolve_relative_url_without_base_fails() {
        let fetcher = HttpFetcher::new();
        let err = fetcher.resolve("/public/data/collaborative.csv").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        let result = HttpFetcher::builder().base_url("not a url").build();
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn test_local_resolve_paths() {
        let fetcher = LocalFetcher::new("/srv/site");
        assert_eq!(
            fetcher.resolve("/public/data/collaborative.csv").unwrap(),
            PathBuf::from("/srv/site/public/data/collaborative.csv")
        );
        assert_eq!(
            fetcher.resolve("public/data/content.csv?v=2").unwrap(),
            PathBuf::from("/srv/site/public/data/content.csv")
        );
        assert_eq!(
            fetcher.resolve("file:///data.json").unwrap(),
            PathBuf::from("/srv/site/data.json")
        );
    }

    #[test]
    fn test_local_resolve_rejects_escapes_and_remote_urls() {
        let fetcher = LocalFetcher::new("/srv/site");
        assert!(fetcher.resolve("/../etc/passwd").is_err());
        assert!(fetcher.resolve("https://fake-api.com/azure").is_err());
        assert!(fetcher.resolve("/").is_err());
    }
}

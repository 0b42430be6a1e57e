//! Source identifiers and endpoint descriptors.
//!
//! A recommendation source is either a JSON endpoint (the body is stored as
//! is) or a tabular endpoint (the body is CSV and one row is looked up).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while interpreting source names and descriptors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid endpoint descriptor {descriptor:?}: expected \"<url>\" or \"<url> <lookup key>\"")]
    InvalidDescriptor { descriptor: String },
}

/// The closed set of recommendation providers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Item-to-item collaborative filtering export
    Collaborative,
    /// Content-based similarity export
    Content,
    /// Hosted model behind a JSON API
    Azure,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::Collaborative, SourceId::Content, SourceId::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Collaborative => "collaborative",
            SourceId::Content => "content",
            SourceId::Azure => "azure",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| SourceError::UnknownSource(s.to_string()))
    }
}

/// Shape of the body a source returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON array of opaque items
    Json,
    /// Comma-separated text keyed by `articleId`
    Tabular,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Json => f.write_str("json"),
            SourceKind::Tabular => f.write_str("tabular"),
        }
    }
}

/// Which submitted identifier a tabular source looks its row up by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    #[default]
    ArticleId,
    UserId,
}

impl LookupKey {
    pub fn select<'a>(&self, user_id: &'a str, article_id: &'a str) -> &'a str {
        match self {
            LookupKey::ArticleId => article_id,
            LookupKey::UserId => user_id,
        }
    }
}

/// A resolved request target for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Json { url: String },
    Tabular { url: String, lookup_key: String },
}

impl Endpoint {
    pub fn json(url: impl Into<String>) -> Self {
        Endpoint::Json { url: url.into() }
    }

    pub fn tabular(url: impl Into<String>, lookup_key: impl Into<String>) -> Self {
        Endpoint::Tabular {
            url: url.into(),
            lookup_key: lookup_key.into(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Endpoint::Json { url } | Endpoint::Tabular { url, .. } => url,
        }
    }

    pub fn lookup_key(&self) -> Option<&str> {
        match self {
            Endpoint::Json { .. } => None,
            Endpoint::Tabular { lookup_key, .. } => Some(lookup_key),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Endpoint::Json { .. } => SourceKind::Json,
            Endpoint::Tabular { .. } => SourceKind::Tabular,
        }
    }
}

/// Parses the compact descriptor form: `"<url>"` for a JSON source,
/// `"<url> <lookup key>"` for a tabular one.
impl FromStr for Endpoint {
    type Err = SourceError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = descriptor.split_whitespace().collect();
        match tokens.as_slice() {
            [url] => Ok(Endpoint::json(*url)),
            [url, lookup_key] => Ok(Endpoint::tabular(*url, *lookup_key)),
            _ => Err(SourceError::InvalidDescriptor {
                descriptor: descriptor.to_string(),
            }),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Json { url } => write!(f, "{}", url),
            Endpoint::Tabular { url, lookup_key } => write!(f, "{} {}", url, lookup_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_round_trips_through_str() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert_eq!(
            "netflix".parse::<SourceId>(),
            Err(SourceError::UnknownSource("netflix".to_string()))
        );
    }

    #[test]
    fn test_source_id_order_follows_declaration() {
        let mut ids = vec![SourceId::Azure, SourceId::Collaborative, SourceId::Content];
        ids.sort();
        assert_eq!(ids, SourceId::ALL.to_vec());
    }

    #[test]
    fn test_descriptor_single_token_is_json() {
        let endpoint: Endpoint = "https://api.example.com/recs?u=1".parse().unwrap();
        assert_eq!(endpoint, Endpoint::json("https://api.example.com/recs?u=1"));
        assert_eq!(endpoint.lookup_key(), None);
        assert_eq!(endpoint.kind(), SourceKind::Json);
    }

    #[test]
    fn test_descriptor_two_tokens_is_tabular() {
        let endpoint: Endpoint = "/public/data/collaborative.csv 42".parse().unwrap();
        assert_eq!(endpoint.url(), "/public/data/collaborative.csv");
        assert_eq!(endpoint.lookup_key(), Some("42"));
        assert_eq!(endpoint.to_string(), "/public/data/collaborative.csv 42");
    }

    #[test]
    fn test_descriptor_rejects_other_token_counts() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("   ".parse::<Endpoint>().is_err());
        assert!("a b c".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_lookup_key_selects_identifier() {
        assert_eq!(LookupKey::ArticleId.select("u7", "a42"), "a42");
        assert_eq!(LookupKey::UserId.select("u7", "a42"), "u7");
    }
}

//! Source configuration loaded from TOML.
//!
//! ```toml
//! base_url = "http://localhost:5173"
//!
//! [[sources]]
//! name = "collaborative"
//! kind = "tabular"
//! url = "/public/data/collaborative.csv"
//!
//! [[sources]]
//! name = "azure"
//! kind = "json"
//! url = "https://fake-api.com/azure?userId={user_id}&articleId={article_id}"
//! enabled = false
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Endpoint, LookupKey, SourceId, SourceKind};

const USER_ID_PLACEHOLDER: &str = "{user_id}";
const ARTICLE_ID_PLACEHOLDER: &str = "{article_id}";

fn default_enabled() -> bool {
    true
}

/// One configured source and how to build its endpoint for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub name: SourceId,
    pub kind: SourceKind,
    /// URL template; `{user_id}` and `{article_id}` are substituted per request
    pub url: String,
    /// Identifier used as the row key (tabular sources only)
    #[serde(default)]
    pub lookup: LookupKey,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SourceSpec {
    pub fn new(name: SourceId, kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            name,
            kind,
            url: url.into(),
            lookup: LookupKey::default(),
            enabled: true,
        }
    }

    pub fn with_lookup(mut self, lookup: LookupKey) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build the endpoint for one request.
    ///
    /// Placeholder values are percent-encoded; the tabular lookup key is
    /// passed through untouched since it is compared against cell text.
    pub fn resolve(&self, user_id: &str, article_id: &str) -> Endpoint {
        let url = self
            .url
            .replace(USER_ID_PLACEHOLDER, &encode(user_id))
            .replace(ARTICLE_ID_PLACEHOLDER, &encode(article_id));

        match self.kind {
            SourceKind::Json => Endpoint::json(url),
            SourceKind::Tabular => Endpoint::tabular(url, self.lookup.select(user_id, article_id)),
        }
    }

    /// True when the url needs a base url (or a data root) to be fetched
    pub fn is_relative(&self) -> bool {
        matches!(
            url::Url::parse(&self.url),
            Err(url::ParseError::RelativeUrlWithoutBase)
        )
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            bail!("source {}: url is empty", self.name);
        }
        if self.url.chars().any(char::is_whitespace) {
            bail!("source {}: url must not contain whitespace", self.name);
        }
        for placeholder in placeholders(&self.url) {
            if placeholder != USER_ID_PLACEHOLDER && placeholder != ARTICLE_ID_PLACEHOLDER {
                bail!(
                    "source {}: unknown placeholder {} in url",
                    self.name,
                    placeholder
                );
            }
        }
        if self.kind == SourceKind::Json && self.lookup != LookupKey::default() {
            warn!(source = %self.name, "lookup is ignored for json sources");
        }
        Ok(())
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Every `{...}` span in a template
fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        match rest[start..].find('}') {
            Some(len) => {
                found.push(&rest[start..start + len + 1]);
                rest = &rest[start + len + 1..];
            }
            None => {
                found.push(&rest[start..]);
                break;
            }
        }
    }
    found
}

/// The full set of sources for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Base that relative source urls are resolved against
    #[serde(default)]
    pub base_url: Option<String>,
    pub sources: Vec<SourceSpec>,
}

impl SourcesConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading sources config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: SourcesConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the store cannot represent
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("at least one source must be configured");
        }

        let mut seen = HashSet::new();
        for spec in &self.sources {
            if !seen.insert(spec.name) {
                bail!("source {} is configured more than once", spec.name);
            }
            spec.validate()?;
        }

        if self.enabled().next().is_none() {
            warn!("no sources are enabled; submissions will not fetch anything");
        }
        debug!(
            configured = self.sources.len(),
            enabled = self.enabled().count(),
            "Validated sources config"
        );
        Ok(())
    }

    /// The sample setup: collaborative CSV on, content CSV and the azure
    /// JSON model present but switched off.
    pub fn reference() -> Self {
        Self {
            base_url: None,
            sources: vec![
                SourceSpec::new(
                    SourceId::Collaborative,
                    SourceKind::Tabular,
                    "/public/data/collaborative.csv",
                ),
                SourceSpec::new(
                    SourceId::Content,
                    SourceKind::Tabular,
                    "public/data/content.csv",
                )
                .with_enabled(false),
                SourceSpec::new(
                    SourceId::Azure,
                    SourceKind::Json,
                    "https://fake-api.com/azure?userId={user_id}&articleId={article_id}",
                )
                .with_enabled(false),
            ],
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Switch a source on or off; unknown names are an error
    pub fn set_enabled(&mut self, id: SourceId, enabled: bool) -> Result<()> {
        match self.sources.iter_mut().find(|spec| spec.name == id) {
            Some(spec) => {
                spec.enabled = enabled;
                Ok(())
            }
            None => bail!("source {} is not configured", id),
        }
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceSpec> {
        self.sources.iter().find(|spec| spec.name == id)
    }

    /// Every configured source, enabled or not, in configuration order
    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|spec| spec.name).collect()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter().filter(|spec| spec.enabled)
    }

    /// Enabled sources whose url only resolves against a base url
    pub fn relative_sources(&self) -> Vec<SourceId> {
        self.enabled()
            .filter(|spec| spec.is_relative())
            .map(|spec| spec.name)
            .collect()
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
base_url = "http://localhost:5173"

[[sources]]
name = "collaborative"
kind = "tabular"
url = "/public/data/collaborative.csv"

[[sources]]
name = "content"
kind = "tabular"
url = "/public/data/content.csv"
lookup = "user_id"
enabled = false

[[sources]]
name = "azure"
kind = "json"
url = "https://fake-api.com/azure?userId={user_id}&articleId={article_id}"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = SourcesConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.base_url.as_deref(), Some("http://localhost:5173"));
        assert_eq!(
            config.source_ids(),
            vec![SourceId::Collaborative, SourceId::Content, SourceId::Azure]
        );

        let content = config.get(SourceId::Content).unwrap();
        assert!(!content.enabled);
        assert_eq!(content.lookup, LookupKey::UserId);

        let enabled: Vec<_> = config.enabled().map(|s| s.name).collect();
        assert_eq!(enabled, vec![SourceId::Collaborative, SourceId::Azure]);
    }

    #[test]
    fn test_duplicate_sources_rejected() {
        let raw = r#"
[[sources]]
name = "collaborative"
kind = "tabular"
url = "/a.csv"

[[sources]]
name = "collaborative"
kind = "json"
url = "/b.json"
"#;
        let err = SourcesConfig::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_unknown_source_name_rejected() {
        let raw = r#"
[[sources]]
name = "popularity"
kind = "json"
url = "/p.json"
"#;
        assert!(SourcesConfig::from_toml_str(raw).is_err());
    }

    #[test]
    fn test_empty_source_list_rejected() {
        assert!(SourcesConfig::from_toml_str("sources = []").is_err());
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let raw = r#"
[[sources]]
name = "azure"
kind = "json"
url = "https://api/recs?session={session_id}"
"#;
        let err = SourcesConfig::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("{session_id}"));
    }

    #[test]
    fn test_url_with_whitespace_rejected() {
        let spec = SourceSpec::new(SourceId::Content, SourceKind::Tabular, "/a b.csv");
        let config = SourcesConfig { base_url: None, sources: vec![spec] };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_json_substitutes_and_encodes() {
        let spec = SourceSpec::new(
            SourceId::Azure,
            SourceKind::Json,
            "https://fake-api.com/azure?userId={user_id}&articleId={article_id}",
        );
        let endpoint = spec.resolve("jane doe", "a&b");
        assert_eq!(
            endpoint,
            Endpoint::json("https://fake-api.com/azure?userId=jane+doe&articleId=a%26b")
        );
    }

    #[test]
    fn test_resolve_tabular_uses_lookup_provider() {
        let spec = SourceSpec::new(SourceId::Collaborative, SourceKind::Tabular, "/c.csv");
        assert_eq!(spec.resolve("7", "42"), Endpoint::tabular("/c.csv", "42"));

        let by_user = spec.clone().with_lookup(LookupKey::UserId);
        assert_eq!(by_user.resolve("7", "42"), Endpoint::tabular("/c.csv", "7"));
    }

    #[test]
    fn test_reference_config_matches_sample_setup() {
        let config = SourcesConfig::reference();
        assert!(config.validate().is_ok());
        assert_eq!(config.source_ids(), SourceId::ALL.to_vec());

        let enabled: Vec<_> = config.enabled().map(|s| s.name).collect();
        assert_eq!(enabled, vec![SourceId::Collaborative]);
    }

    #[test]
    fn test_relative_sources() {
        let reference = SourcesConfig::reference();
        assert!(reference.get(SourceId::Collaborative).unwrap().is_relative());
        assert!(reference.get(SourceId::Content).unwrap().is_relative());
        assert!(!reference.get(SourceId::Azure).unwrap().is_relative());

        // Only enabled sources count
        assert_eq!(reference.relative_sources(), vec![SourceId::Collaborative]);

        let mut all_on = reference.clone();
        all_on.set_enabled(SourceId::Content, true).unwrap();
        all_on.set_enabled(SourceId::Azure, true).unwrap();
        assert_eq!(
            all_on.relative_sources(),
            vec![SourceId::Collaborative, SourceId::Content]
        );
    }

    #[test]
    fn test_set_enabled() {
        let mut config = SourcesConfig::reference();
        config.set_enabled(SourceId::Azure, true).unwrap();
        assert!(config.get(SourceId::Azure).unwrap().enabled);

        let mut single = SourcesConfig {
            base_url: None,
            sources: vec![SourceSpec::new(SourceId::Content, SourceKind::Tabular, "/c.csv")],
        };
        assert!(single.set_enabled(SourceId::Azure, true).is_err());
    }

    #[test]
    fn test_placeholders_scan() {
        assert_eq!(placeholders("/a/{user_id}/{article_id}"), vec!["{user_id}", "{article_id}"]);
        assert_eq!(placeholders("/plain"), Vec::<&str>::new());
        assert_eq!(placeholders("/broken{"), vec!["{"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let config = SourcesConfig::load(file.path()).unwrap();
        assert_eq!(config.sources.len(), 3);

        let err = SourcesConfig::load("/no/such/sources.toml").unwrap_err();
        assert!(err.to_string().contains("reading sources config"));
    }
}

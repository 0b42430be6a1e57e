//! # Sources Crate
//!
//! Describes where recommendations come from.
//!
//! ## Components
//!
//! ### Source identifiers
//! `SourceId` is the closed set of providers (`collaborative`, `content`,
//! `azure`). All per-source state is keyed by it.
//!
//! ### Endpoints
//! `Endpoint` is either `Json { url }` or `Tabular { url, lookup_key }`. The
//! compact string form `"<url> <lookup key>"` parses into it.
//!
//! ### Configuration
//! `SourcesConfig` lists the configured sources with their URL templates and
//! enabled flags, loaded from TOML and validated up front.
//!
//! ## Example Usage
//!
//! ```
//! use sources::{Endpoint, SourceId, SourcesConfig};
//!
//! let config = SourcesConfig::reference();
//! let spec = config.get(SourceId::Collaborative).unwrap();
//!
//! assert_eq!(
//!     spec.resolve("7", "42"),
//!     Endpoint::tabular("/public/data/collaborative.csv", "42")
//! );
//! ```

// Public modules
pub mod types;
pub mod config;

// Re-export commonly used types
pub use types::{Endpoint, LookupKey, SourceError, SourceId, SourceKind};
pub use config::{SourceSpec, SourcesConfig};

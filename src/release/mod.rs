//! Release data pipeline
//!
//! Fetches release metadata from upstream, normalizes it into a snapshot,
//! caches the snapshot whole, and derives the views served to clients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │   Source    │────▶│ Normalizer  │────▶│ Orchestrator │◀────▶ Cache (key/value)
//! │  (fetch)    │     │  (filter)   │     │ (freshness)  │
//! └─────────────┘     └─────────────┘     └──────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │   Sources   │                         │    Query    │
//! │  (github)   │                         │  (views)    │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: Key/value store trait with SQLite and in-memory backends
//! - [`error`]: Upstream error taxonomy and cache errors
//! - [`normalizer`]: Raw release filtering and per-release metadata resolution
//! - [`orchestrator`]: Cache / fresh / stale decision per read
//! - [`query`]: Latest, lookup, changelog, count and status views
//! - [`secret`]: Memoized credential for the forced-refresh trigger
//! - [`semver`]: Tag parsing and ordering
//! - [`source`]: Trait for fetching raw releases from upstream
//! - [`sources`]: Concrete sources (GitHub)
//! - [`types`]: `ReleaseRecord`, `ReleaseSnapshot` and read provenance

pub mod cache;
pub mod error;
pub mod normalizer;
pub mod orchestrator;
pub mod query;
pub mod secret;
pub mod semver;
pub mod source;
pub mod sources;
pub mod types;

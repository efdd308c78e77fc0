//! # Catalog Crate
//!
//! Everything the round engine needs from the external movie catalog.
//!
//! ## Components
//!
//! ### Providers
//! - [`HttpCatalog`]: TMDB-compatible REST discovery and detail lookups
//! - [`FileCatalog`]: offline catalog dump, same query semantics
//! - [`CachedCatalog`]: TTL cache keyed by query content, wraps either
//!
//! ### Candidate generation
//! - [`PreferenceAggregator`]: attendee profiles to [`GroupConstraints`]
//! - [`CandidatePool`]: discovery pages plus watchlist, deduplicated
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CachedCatalog, CandidatePool, FileCatalog, PreferenceAggregator};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let file = Arc::new(FileCatalog::from_path("data/catalog.dat")?);
//! let catalog = Arc::new(CachedCatalog::new(file, 1000, Duration::from_secs(600)));
//!
//! let constraints = PreferenceAggregator::aggregate(&profiles);
//! let pool = CandidatePool::new(catalog).with_pages(2);
//! let candidates = pool.gather(&constraints, &watched, &watchlist).await?;
//! ```

pub mod cache;
pub mod file;
pub mod http;
pub mod pool;
pub mod preferences;
pub mod provider;
pub mod types;

pub use cache::CachedCatalog;
pub use file::FileCatalog;
pub use http::HttpCatalog;
pub use pool::CandidatePool;
pub use preferences::PreferenceAggregator;
pub use provider::{CatalogError, CatalogProvider};
pub use types::{Candidate, CatalogPage, DiscoverQuery, GroupConstraints};

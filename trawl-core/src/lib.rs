//! Trawl Core - Full-result-set scroll queries
//!
//! This library drives a paginated search to exhaustion through server-issued
//! scroll tokens and merges every page into a single in-memory result. The
//! network side lives behind the [`Transport`] trait.

pub mod aggregate;
pub mod config;
pub mod document;
pub mod error;
pub mod page;
pub mod query;
pub mod scroll;
pub mod transport;

pub use aggregate::{aggregate, AggregatedResult};
pub use config::Config;
pub use document::{Document, TotalHits, TotalRelation};
pub use error::TrawlError;
pub use page::{decode_error, decode_page, Page, RawResponse};
pub use query::{Query, QueryBuilder, DEFAULT_PAGE_SIZE};
pub use scroll::{fetch_all, Interrupted, Scroller, DEFAULT_LEASE};
pub use transport::{CancellationToken, Transport};

/// Result type alias for trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

//! Trawl Client - HTTP transport for scroll queries
//!
//! Provides `HttpTransport`, the reqwest-backed implementation of
//! `trawl_core::Transport`, so callers only construct a client and hand it to
//! a `Scroller`.

pub mod http_transport;

pub use http_transport::{format_lease, HttpTransport};

//! Shared HTTP client layer for chart resources.
//!
//! This crate owns everything between the resource services and the wire: the
//! [`FetchClient`] transport seam with its reqwest-backed and scripted mock
//! implementations, and the [`ResponseCache`] that coalesces and caches
//! resource fetches keyed by relative URL.

pub mod cache;
pub mod fetch;

pub use cache::{ResponseCache, RevalidationPolicy, SharedFetchResult};
pub use fetch::{
    FetchClient, FetchError, FetchResponse, FetchResult, HttpFetchClient, HttpFetchClientConfig,
    MockFetchClient, Representation, RequestDescriptor, RequestKey, StatusCode,
};

/// Cancellation token handed to [`FetchClient::delete`]. Re-exported so
/// downstream crates do not need their own `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;

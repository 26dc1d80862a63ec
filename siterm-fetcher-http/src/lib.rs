//! HTTP side of the SiteRM config fetcher.
//!
//! Provides:
//! - `http`: the `HttpClient` seam and its `ureq`-backed implementation
//! - `retry`: declarative `RetryPolicy` and the `RetryingFetcher` built on it
//! - `notify`: reload requests sent to the site frontend
//! - `testing`: scripted client and recording notifier for tests (behind the
//!   `testing` feature)

pub mod error;
pub mod http;
pub mod notify;
pub mod retry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::HttpError;
pub use http::{HttpClient, HttpResponse, UreqClient, validate_url};
pub use notify::{HttpReloadNotifier, ReloadNotifier, ReloadRequest};
pub use retry::{Backoff, FetchOutcome, RetryPolicy, RetryingFetcher};

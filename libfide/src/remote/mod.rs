mod client;

use std::collections::BTreeSet;

use fide_server::{CountriesResponse, PlayersPage};
use thiserror::Error;

pub use client::HttpFetcher;

/// Failure of a single read. Cloneable so it can be kept in the view state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response code: {0}")]
    UnexpectedStatus(u16),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("No response after {0} ms")]
    TimedOut(u64),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type FetchFuture<T> = futures::future::BoxFuture<'static, Result<T, FetchError>>;
#[cfg(target_arch = "wasm32")]
pub type FetchFuture<T> = futures::future::LocalBoxFuture<'static, Result<T, FetchError>>;

/// Source of player pages. The controller only talks to the API through this trait.
pub trait PageFetcher: Send + Sync {
    fn fetch_page(&self, url: &str) -> FetchFuture<PlayersPage>;
    /// Distinct, sorted country names.
    fn fetch_countries(&self, url: &str) -> FetchFuture<Vec<String>>;
}

/// Removes empty and duplicate country names and sorts the rest.
#[must_use]
pub fn distinct_countries(response: CountriesResponse) -> Vec<String> {
    response
        .rows
        .into_iter()
        .filter_map(|row| row.country)
        .filter(|country| !country.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

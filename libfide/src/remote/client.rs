use std::sync::OnceLock;

use fide_server::{
    CountriesResponse, FIDE_SERVER_VERSION, HTTP_SERVER_KEY, HTTP_SERVER_VALUE_FIDE, PlayersPage,
    X_FIDE_SERVER_VERSION,
};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{FetchError, FetchFuture, PageFetcher, distinct_countries};

/// Returns a shared reqwest client to reuse HTTP connections and reduce TLS overhead.
fn get_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

/// Notes when we are talking to a development server of another version.
fn check_response(url: &str, response: &reqwest::Response) {
    let server = response
        .headers()
        .get(HTTP_SERVER_KEY)
        .and_then(|value| value.to_str().ok());
    if server != Some(HTTP_SERVER_VALUE_FIDE) {
        return;
    }
    let version = response
        .headers()
        .get(X_FIDE_SERVER_VERSION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");
    if version != FIDE_SERVER_VERSION {
        info!(
            "fide-server version {version} at {url} does not match client version {FIDE_SERVER_VERSION}"
        );
    }
}

async fn get_json<T: DeserializeOwned>(url: String) -> Result<T, FetchError> {
    let response = get_client().get(&url).send().await?;
    check_response(&url, &response);
    let status = response.status();
    if !status.is_success() {
        warn!("Unexpected response code {status} for {url}");
        return Err(FetchError::UnexpectedStatus(status.as_u16()));
    }
    let body = response.text().await?;
    debug!("Received {} bytes from {url}", body.len());
    Ok(serde_json::from_str(&body)?)
}

/// Reads pages and countries over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

#[cfg(not(target_arch = "wasm32"))]
fn boxed<T: 'static>(
    future: impl Future<Output = Result<T, FetchError>> + Send + 'static,
) -> FetchFuture<T> {
    future.boxed()
}

#[cfg(target_arch = "wasm32")]
fn boxed<T: 'static>(future: impl Future<Output = Result<T, FetchError>> + 'static) -> FetchFuture<T> {
    future.boxed_local()
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, url: &str) -> FetchFuture<PlayersPage> {
        boxed(get_json::<PlayersPage>(url.to_string()))
    }

    fn fetch_countries(&self, url: &str) -> FetchFuture<Vec<String>> {
        boxed(get_json::<CountriesResponse>(url.to_string()).map(|r| r.map(distinct_countries)))
    }
}

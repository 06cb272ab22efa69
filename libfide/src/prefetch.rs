use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{debug, warn};

use crate::async_util::perform_async_work;
use crate::cache::ResponseCache;
use crate::message::Message;
use crate::remote::PageFetcher;

/// Background loading of the page after the one on screen.
///
/// Results are posted as [`Message::PagePrefetched`] and go into the cache only. At most
/// one request per URL is in flight.
#[derive(Debug, Default)]
pub struct Prefetcher {
    /// URL to the cache generation the request was issued in
    in_flight: HashMap<String, u64>,
}

impl Prefetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts fetching `next_url` unless it is absent, cached or already requested.
    /// Returns whether a request was issued.
    pub fn maybe_prefetch(
        &mut self,
        next_url: Option<&str>,
        cache: &ResponseCache,
        fetcher: &Arc<dyn PageFetcher>,
        sender: &Sender<Message>,
    ) -> bool {
        let Some(url) = next_url else {
            return false;
        };
        if cache.contains(url) || self.in_flight.contains_key(url) {
            debug!("Skipping prefetch of {url}");
            return false;
        }

        let generation = cache.generation();
        self.in_flight.insert(url.to_string(), generation);
        debug!("Prefetching {url}");

        let future = fetcher.fetch_page(url);
        let url = url.to_string();
        let sender = sender.clone();
        perform_async_work(async move {
            let result = future.await;
            if sender
                .send(Message::PagePrefetched {
                    url,
                    generation,
                    result,
                })
                .is_err()
            {
                warn!("Prefetch finished after the controller was dropped");
            }
        });
        true
    }

    /// Marks the request issued in `generation` as finished.
    pub fn complete(&mut self, url: &str, generation: u64) {
        if self.in_flight.get(url) == Some(&generation) {
            self.in_flight.remove(url);
        }
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
    }

    #[must_use]
    pub fn is_in_flight(&self, url: &str) -> bool {
        self.in_flight.contains_key(url)
    }
}

//! URL-keyed store of fetched pages.
use fide_server::{Player, PlayersPage};
use indexmap::IndexMap;
use tracing::debug;

use crate::url_builder::upgrade_to_https;

/// One fetched page. `next_url` is already normalized and can be used as cache key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageResult {
    pub rows: Vec<Player>,
    pub next_url: Option<String>,
}

impl PageResult {
    #[must_use]
    pub fn from_page(page: PlayersPage, upgrade_scheme: bool) -> Self {
        let next_url = if upgrade_scheme {
            page.next_url.as_deref().map(upgrade_to_https)
        } else {
            page.next_url
        };
        Self {
            rows: page.rows,
            next_url,
        }
    }
}

/// Pages by request URL, ordered from least to most recently used.
///
/// The generation is bumped on every reset. Background work remembers the generation it
/// started in and only stores its result if the cache has not been reset since.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: IndexMap<String, PageResult>,
    /// `0` means unbounded
    capacity: usize,
    generation: u64,
}

impl ResponseCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity,
            generation: 0,
        }
    }

    /// Looks up `url` and marks it as most recently used.
    pub fn get(&mut self, url: &str) -> Option<&PageResult> {
        let index = self.entries.get_index_of(url)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, page)| page)
    }

    /// Stores `page` under `url`, replacing any previous entry.
    pub fn put(&mut self, url: String, page: PageResult) {
        self.entries.shift_remove(&url);
        self.entries.insert(url, page);
        if self.capacity > 0 {
            while self.entries.len() > self.capacity {
                if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                    debug!("Evicting {evicted} from page cache");
                }
            }
        }
    }

    /// Stores `page` only if no reset happened since `generation` was observed.
    pub fn put_if_current(&mut self, generation: u64, url: String, page: PageResult) -> bool {
        if generation != self.generation {
            debug!("Dropping page for {url} from cache generation {generation}");
            return false;
        }
        self.put(url, page);
        true
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.generation += 1;
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

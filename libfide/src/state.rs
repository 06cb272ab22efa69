//! State observed by the render layer. Only the controller mutates it.
use derive_more::Display;
use fide_server::{Player, PlayerId};

use crate::cache::ResponseCache;
use crate::navigator::PageNavigator;
use crate::remote::FetchError;
use crate::url_builder::FilterState;

#[derive(Debug, Clone, PartialEq, Eq, Default, Display)]
pub enum LoadStatus {
    #[default]
    #[display("idle")]
    Idle,
    #[display("loading {url}")]
    Loading { url: String, epoch: u64 },
    #[display("loaded {url}")]
    Loaded { url: String },
    #[display("failed to load {url}: {error}")]
    Failed { url: String, error: FetchError },
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Rows of the last loaded page. They stay visible while the next page loads.
    pub rows: Vec<Player>,
    pub next_url: Option<String>,
    pub status: LoadStatus,
    pub toast_visible: bool,
}

impl ViewState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            LoadStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct BrowserState {
    pub filter: FilterState,
    pub view: ViewState,
    pub navigator: PageNavigator,
    pub cache: ResponseCache,
    /// Empty until the country list has loaded
    pub countries: Vec<String>,
    pub selected: Option<PlayerId>,
}

impl BrowserState {
    #[must_use]
    pub fn new(filter: FilterState, cache_capacity: usize) -> Self {
        Self {
            filter,
            view: ViewState::default(),
            navigator: PageNavigator::new(),
            cache: ResponseCache::new(cache_capacity),
            countries: vec![],
            selected: None,
        }
    }

    /// 1-based number of the page on screen.
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.navigator.depth().max(1)
    }
}

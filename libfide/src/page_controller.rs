//! Orchestration of page loads: filter changes, pagination, caching and prefetching.
use std::sync::Arc;
use std::sync::mpsc::Sender;

use eyre::{Context, Result};
use fide_server::Player;
use tracing::{debug, info, trace, warn};
use url::Url;
use web_time::Instant;

use crate::Channels;
use crate::address_bar::AddressBar;
use crate::async_util::{perform_async_work, sleep_ms};
use crate::cache::PageResult;
use crate::config::FideConfig;
use crate::debounce::{DebounceGate, DebounceOutcome};
use crate::message::Message;
use crate::prefetch::Prefetcher;
use crate::remote::{FetchError, PageFetcher};
use crate::state::{BrowserState, LoadStatus};
use crate::url_builder::{self, FilterState};

/// Called with the player whose row was selected.
pub type SelectionCallback = Box<dyn FnMut(&Player) + Send>;

/// Inputs a pending search depends on. A debounced search only runs if these are unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchSnapshot {
    search_text: Option<String>,
    country: Option<String>,
}

pub struct PageController {
    config: FideConfig,
    base_url: Url,
    state: BrowserState,
    fetcher: Arc<dyn PageFetcher>,
    address_bar: Box<dyn AddressBar>,
    on_select: Option<SelectionCallback>,
    channels: Channels,
    prefetcher: Prefetcher,
    search_debounce: DebounceGate<SearchSnapshot>,
    /// Bumped on every page load and query reset. Only the latest load may update the view.
    request_epoch: u64,
    last_address_query: Option<String>,
    toast_ticket: u64,
    /// Start of the live request currently on screen as `Loading`
    loading_since: Option<Instant>,
    /// Fetches whose completion message has not been handled yet
    outstanding_fetches: usize,
}

impl PageController {
    pub fn new(
        config: FideConfig,
        fetcher: Arc<dyn PageFetcher>,
        address_bar: Box<dyn AddressBar>,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.api.players_url)
            .with_context(|| format!("Invalid players URL: {}", config.api.players_url))?;
        let filter = FilterState::new(&config.behavior.default_sort_key);
        Ok(Self {
            base_url,
            state: BrowserState::new(filter, config.behavior.cache_capacity),
            fetcher,
            address_bar,
            on_select: None,
            channels: Channels::new(),
            prefetcher: Prefetcher::new(),
            search_debounce: DebounceGate::new(config.behavior.search_debounce_ms),
            request_epoch: 0,
            last_address_query: None,
            toast_ticket: 0,
            loading_since: None,
            outstanding_fetches: 0,
            config,
        })
    }

    #[must_use]
    pub fn with_selection_callback(mut self, callback: SelectionCallback) -> Self {
        self.on_select = Some(callback);
        self
    }

    #[must_use]
    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &FideConfig {
        &self.config
    }

    /// Sender for feeding user messages from other threads or tasks.
    #[must_use]
    pub fn sender(&self) -> Sender<Message> {
        self.channels.msg_sender.clone()
    }

    /// Restores the selection from the address bar and loads the countries and the first page.
    pub fn start(&mut self) {
        let query = self.address_bar.query();
        self.state.filter =
            FilterState::from_address_query(&query, &self.config.behavior.default_sort_key);
        info!("Starting with {:?}", self.state.filter);
        self.fetch_countries();
        self.fetch_page(None);
    }

    pub fn update(&mut self, message: Message) {
        trace!("Handling {message:?}");
        match message {
            Message::SetCountry(country) => {
                self.state.filter.set_country(country);
                self.reset_query();
                // The load below already carries the current search text.
                self.search_debounce.cancel();
                self.fetch_page(None);
            }
            Message::SetSearchText(text) => {
                self.state.filter.set_search_text(text);
                self.reset_query();
                let ticket = self.search_debounce.trigger(self.search_snapshot());
                let delay = self.search_debounce.delay_ms();
                self.send_after(delay, Message::SearchDebounceElapsed { ticket });
            }
            Message::SortBy(key) => {
                self.state.filter.sort_by(key);
                self.reset_query();
                self.search_debounce.cancel();
                self.fetch_page(None);
            }
            Message::NextPage => match self.state.view.next_url.clone() {
                Some(next_url) => self.fetch_page(Some(next_url)),
                None => debug!("No next page"),
            },
            Message::PreviousPage => match self.state.navigator.pop_to_previous() {
                Some(previous) => self.fetch_page(Some(previous)),
                None => debug!("Already on the first page"),
            },
            Message::Retry => match &self.state.view.status {
                LoadStatus::Failed { url, .. }
                    if self.state.navigator.current() == Some(url.as_str()) =>
                {
                    let url = url.clone();
                    info!("Retrying {url}");
                    self.load_url(url);
                }
                status => debug!("Nothing to retry while {status}"),
            },
            Message::SelectPlayer(player) => {
                self.state.selected = Some(player.fideid);
                if let Some(callback) = self.on_select.as_mut() {
                    callback(&player);
                }
            }
            Message::ShowToast => {
                self.toast_ticket += 1;
                self.state.view.toast_visible = true;
                let ticket = self.toast_ticket;
                self.send_after(
                    self.config.behavior.toast_duration_ms,
                    Message::HideToast { ticket },
                );
            }
            Message::CountriesLoaded(result) => {
                self.finish_fetch();
                match result {
                    Ok(countries) => {
                        info!("Loaded {} countries", countries.len());
                        self.state.countries = countries;
                    }
                    Err(e) => warn!("Failed to load countries: {e}"),
                }
            }
            Message::PageFetched {
                url,
                epoch,
                generation,
                result,
            } => {
                self.finish_fetch();
                self.page_fetched(url, epoch, generation, result);
            }
            Message::PagePrefetched {
                url,
                generation,
                result,
            } => {
                self.finish_fetch();
                self.prefetcher.complete(&url, generation);
                match result {
                    Ok(page) => {
                        let page = self.page_result(page);
                        self.state.cache.put_if_current(generation, url, page);
                    }
                    Err(e) => warn!("Prefetch of {url} failed: {e}"),
                }
            }
            Message::SearchDebounceElapsed { ticket } => {
                match self.search_debounce.fire(ticket, &self.search_snapshot()) {
                    DebounceOutcome::Run => self.fetch_page(None),
                    outcome => debug!("Skipping search {ticket}: {outcome:?}"),
                }
            }
            Message::FetchTimedOut { epoch } => {
                if epoch != self.request_epoch {
                    return;
                }
                if let LoadStatus::Loading { url, .. } = &self.state.view.status {
                    let timeout = self.config.behavior.fetch_timeout_ms;
                    warn!("Request for {url} timed out after {timeout} ms");
                    self.state.view.status = LoadStatus::Failed {
                        url: url.clone(),
                        error: FetchError::TimedOut(timeout),
                    };
                }
            }
            Message::HideToast { ticket } => {
                if ticket == self.toast_ticket {
                    self.state.view.toast_visible = false;
                }
            }
        }
    }

    /// Handles every message that has arrived so far, in arrival order.
    pub fn handle_async_messages(&mut self) {
        let mut msgs = vec![];
        loop {
            match self.channels.msg_receiver.try_recv() {
                Ok(msg) => msgs.push(msg),
                Err(std::sync::mpsc::TryRecvError::Empty) => break,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    trace!("Message sender disconnected");
                    break;
                }
            }
        }

        for msg in msgs {
            self.update(msg);
        }
    }

    /// True while fetches are in flight or a search is waiting for its quiet period.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.outstanding_fetches > 0 || self.search_debounce.is_pending()
    }

    /// True while a background request for `url` is outstanding.
    #[must_use]
    pub fn is_prefetching(&self, url: &str) -> bool {
        self.prefetcher.is_in_flight(url)
    }

    /// Builds the table URL for the current selection and mirrors the selection into the
    /// address bar.
    pub fn build_query_url(&mut self) -> String {
        let url = url_builder::build_query_url(
            &self.base_url,
            self.config.api.page_size,
            &self.state.filter,
        );
        let query = self.state.filter.to_address_query();
        self.address_bar.replace_query(&query);
        self.last_address_query = Some(query);
        url.to_string()
    }

    /// Loads `url`, or the first page of the current selection if `None`, as a new page.
    pub fn fetch_page(&mut self, url: Option<String>) {
        let url = url.unwrap_or_else(|| self.build_query_url());
        self.state.navigator.push(url.clone());
        self.load_url(url);
    }

    /// Starts over for a new selection: forgets visited pages and cached results and
    /// invalidates everything in flight.
    pub fn reset_query(&mut self) {
        self.state.navigator.reset();
        self.state.cache.reset();
        self.prefetcher.clear();
        self.state.view.next_url = None;
        self.request_epoch += 1;
        // A failure belongs to the old selection and must not be retried under the new one.
        if !matches!(self.state.view.status, LoadStatus::Loaded { .. }) {
            self.state.view.status = LoadStatus::Idle;
        }
    }

    fn load_url(&mut self, url: String) {
        self.request_epoch += 1;
        if let Some(page) = self.state.cache.get(&url).cloned() {
            debug!("Serving {url} from cache");
            self.loading_since = None;
            self.show_page(url, page);
            return;
        }

        let epoch = self.request_epoch;
        let generation = self.state.cache.generation();
        debug!("Fetching {url} (epoch {epoch})");
        self.state.view.status = LoadStatus::Loading {
            url: url.clone(),
            epoch,
        };
        self.state.view.next_url = None;
        self.loading_since = Some(Instant::now());

        self.outstanding_fetches += 1;
        let future = self.fetcher.fetch_page(&url);
        let sender = self.channels.msg_sender.clone();
        perform_async_work(async move {
            let result = future.await;
            let _ = sender.send(Message::PageFetched {
                url,
                epoch,
                generation,
                result,
            });
        });
        self.send_after(
            self.config.behavior.fetch_timeout_ms,
            Message::FetchTimedOut { epoch },
        );
    }

    fn page_fetched(
        &mut self,
        url: String,
        epoch: u64,
        generation: u64,
        result: Result<fide_server::PlayersPage, FetchError>,
    ) {
        let is_current = epoch == self.request_epoch
            && matches!(&self.state.view.status, LoadStatus::Loading { url: loading, .. } if *loading == url);
        match result {
            Ok(page) => {
                let page = self.page_result(page);
                self.state
                    .cache
                    .put_if_current(generation, url.clone(), page.clone());
                if is_current {
                    self.show_page(url, page);
                } else {
                    debug!("Discarding stale response for {url} (epoch {epoch})");
                }
            }
            Err(error) if is_current => {
                warn!("Failed to load {url}: {error}");
                self.state.view.status = LoadStatus::Failed { url, error };
            }
            Err(error) => debug!("Ignoring stale failure for {url}: {error}"),
        }
    }

    fn show_page(&mut self, url: String, page: PageResult) {
        match self.loading_since.take() {
            Some(start) => info!(
                "Showing {} players from {url} after {:?}",
                page.rows.len(),
                start.elapsed()
            ),
            None => info!("Showing {} cached players from {url}", page.rows.len()),
        }
        self.state.view.rows = page.rows;
        self.state.view.next_url = page.next_url;
        self.state.view.status = LoadStatus::Loaded { url };
        self.sync_address_bar();

        let next_url = self.state.view.next_url.clone();
        if self.prefetcher.maybe_prefetch(
            next_url.as_deref(),
            &self.state.cache,
            &self.fetcher,
            &self.channels.msg_sender,
        ) {
            self.outstanding_fetches += 1;
        }
    }

    fn sync_address_bar(&mut self) {
        let query = self.state.filter.to_address_query();
        if self.last_address_query.as_ref() != Some(&query) {
            self.address_bar.replace_query(&query);
            self.last_address_query = Some(query);
        }
    }

    fn fetch_countries(&mut self) {
        self.outstanding_fetches += 1;
        let future = self.fetcher.fetch_countries(&self.config.api.countries_url);
        let sender = self.channels.msg_sender.clone();
        perform_async_work(async move {
            let result = future.await;
            let _ = sender.send(Message::CountriesLoaded(result));
        });
    }

    fn page_result(&self, page: fide_server::PlayersPage) -> PageResult {
        PageResult::from_page(page, self.config.api.upgrade_next_url_scheme)
    }

    fn search_snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            search_text: self.state.filter.search_text.clone(),
            country: self.state.filter.country.clone(),
        }
    }

    fn finish_fetch(&mut self) {
        self.outstanding_fetches = self.outstanding_fetches.saturating_sub(1);
    }

    fn send_after(&self, delay_ms: u64, message: Message) {
        let sender = self.channels.msg_sender.clone();
        perform_async_work(async move {
            sleep_ms(delay_ms).await;
            let _ = sender.send(message);
        });
    }
}

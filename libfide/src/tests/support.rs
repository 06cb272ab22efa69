use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::watch;

use crate::config::FideConfig;
use crate::remote::{FetchError, FetchFuture, PageFetcher};
use crate::url_builder::{FilterState, build_query_url};
use crate::{MemoryAddressBar, PageController, Player, PlayersPage};

pub(super) const FIRST_PAGE: &str =
    "https://fide-players.fly.dev/players/players.json?_size=20&_extra=next_url&_sort=fideid";

/// Continuation URL of the default query.
pub(super) fn page_url(offset: usize) -> String {
    format!("{FIRST_PAGE}&_next={offset}")
}

/// First-page URL of `filter` with the default configuration.
pub(super) fn query_url(filter: &FilterState) -> String {
    let config = FideConfig::new_default().expect("config");
    let base = url::Url::parse(&config.api.players_url).expect("base url");
    build_query_url(&base, config.api.page_size, filter).to_string()
}

pub(super) fn players_page(ids: std::ops::Range<u64>, next_url: Option<&str>) -> PlayersPage {
    PlayersPage {
        rows: ids.map(|id| Player::new(id, Some("NOR"))).collect(),
        next_url: next_url.map(str::to_string),
    }
}

pub(super) fn row_ids(controller: &PageController) -> Vec<u64> {
    controller
        .state()
        .view
        .rows
        .iter()
        .map(|player| player.fideid.0)
        .collect()
}

/// Keeps requests for one URL waiting until released.
pub(super) struct Hold(watch::Sender<bool>);

impl Hold {
    pub(super) fn release(&self) {
        let _ = self.0.send(true);
    }
}

/// Fetcher answering from a fixed table of URLs and recording every request.
#[derive(Default)]
pub(super) struct StubFetcher {
    pages: Mutex<HashMap<String, Result<PlayersPage, FetchError>>>,
    countries: Vec<String>,
    calls: Mutex<Vec<String>>,
    holds: Mutex<HashMap<String, watch::Receiver<bool>>>,
}

impl StubFetcher {
    pub(super) fn new() -> Self {
        Self {
            countries: vec!["FRA".to_string(), "NOR".to_string()],
            ..Default::default()
        }
    }

    pub(super) fn with_page(self, url: &str, page: PlayersPage) -> Self {
        self.set_result(url, Ok(page));
        self
    }

    pub(super) fn set_result(&self, url: &str, result: Result<PlayersPage, FetchError>) {
        self.pages
            .lock()
            .expect("pages")
            .insert(url.to_string(), result);
    }

    pub(super) fn hold(&self, url: &str) -> Hold {
        let (sender, receiver) = watch::channel(false);
        self.holds
            .lock()
            .expect("holds")
            .insert(url.to_string(), receiver);
        Hold(sender)
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub(super) fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|call| *call == url).count()
    }
}

impl PageFetcher for StubFetcher {
    fn fetch_page(&self, url: &str) -> FetchFuture<PlayersPage> {
        self.calls.lock().expect("calls").push(url.to_string());
        let result = self
            .pages
            .lock()
            .expect("pages")
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::UnexpectedStatus(404)));
        let hold = self.holds.lock().expect("holds").get(url).cloned();
        async move {
            if let Some(mut hold) = hold {
                let _ = hold.wait_for(|released| *released).await;
            }
            result
        }
        .boxed()
    }

    fn fetch_countries(&self, _url: &str) -> FetchFuture<Vec<String>> {
        let countries = self.countries.clone();
        async move { Ok(countries) }.boxed()
    }
}

pub(super) fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("runtime")
}

/// Default configuration with short timers.
pub(super) fn test_config() -> FideConfig {
    let mut config = FideConfig::new_default().expect("config");
    config.behavior.search_debounce_ms = 20;
    config.behavior.toast_duration_ms = 20;
    config.behavior.fetch_timeout_ms = 5_000;
    config
}

pub(super) fn controller_with(
    config: FideConfig,
    fetcher: &Arc<StubFetcher>,
    address_bar: &MemoryAddressBar,
) -> PageController {
    PageController::new(config, fetcher.clone(), Box::new(address_bar.clone()))
        .expect("controller")
}

pub(super) fn started_controller(
    fetcher: &Arc<StubFetcher>,
    address_bar: &MemoryAddressBar,
) -> PageController {
    let mut controller = controller_with(test_config(), fetcher, address_bar);
    controller.start();
    wait_for_idle(&mut controller);
    controller
}

/// Handles messages until `done` holds, panicking after a few seconds.
pub(super) fn wait_until(
    controller: &mut PageController,
    what: &str,
    done: impl Fn(&PageController) -> bool,
) {
    let start = Instant::now();
    loop {
        controller.handle_async_messages();
        if done(controller) {
            break;
        }
        if start.elapsed().as_secs() > 5 {
            panic!("timed out waiting for {what}");
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

pub(super) fn wait_for_idle(controller: &mut PageController) {
    wait_until(controller, "pending work", |c| !c.has_pending_work());
}

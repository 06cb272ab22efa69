use std::sync::{Arc, Mutex};

use super::support::*;
use crate::message::Message;
use crate::remote::FetchError;
use crate::state::LoadStatus;
use crate::{MemoryAddressBar, Player, PlayerId};

#[test_log::test]
fn start_loads_first_page_countries_and_prefetches() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let next = page_url(20);
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(FIRST_PAGE, players_page(1..21, Some(&next)))
            .with_page(&next, players_page(21..41, None)),
    );
    let address_bar = MemoryAddressBar::default();
    let controller = started_controller(&fetcher, &address_bar);

    let state = controller.state();
    assert_eq!(row_ids(&controller), (1..21).collect::<Vec<_>>());
    assert_eq!(state.view.next_url.as_deref(), Some(next.as_str()));
    assert_eq!(
        state.view.status,
        LoadStatus::Loaded {
            url: FIRST_PAGE.to_string()
        }
    );
    assert_eq!(state.countries, vec!["FRA", "NOR"]);
    assert_eq!(state.navigator.depth(), 1);

    // The next page was fetched in the background and cached without being shown.
    assert_eq!(fetcher.calls(), vec![FIRST_PAGE.to_string(), next.clone()]);
    assert!(state.cache.contains(&next));
    assert_eq!(state.cache.len(), 2);

    assert_eq!(address_bar.writes(), vec!["sort=fideid&order=asc".to_string()]);
}

#[test]
fn next_page_from_cache_makes_no_request() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let next = page_url(20);
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(FIRST_PAGE, players_page(1..21, Some(&next)))
            .with_page(&next, players_page(21..41, None)),
    );
    let mut controller = started_controller(&fetcher, &MemoryAddressBar::default());
    let calls_before = fetcher.calls().len();

    controller.update(Message::NextPage);

    // Served synchronously, no message handling needed.
    assert_eq!(row_ids(&controller), (21..41).collect::<Vec<_>>());
    assert_eq!(controller.state().view.next_url, None);
    assert!(!controller.state().view.is_loading());
    assert_eq!(fetcher.calls().len(), calls_before);
    assert!(!controller.has_pending_work());
}

#[test]
fn cached_page_matches_fetched_page() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let next = page_url(20);
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(FIRST_PAGE, players_page(1..21, Some(&next)))
            .with_page(&next, players_page(21..41, None)),
    );
    let mut controller = started_controller(&fetcher, &MemoryAddressBar::default());
    let first_rows = controller.state().view.rows.clone();

    controller.update(Message::NextPage);
    controller.update(Message::PreviousPage);

    assert_eq!(controller.state().view.rows, first_rows);
    assert_eq!(controller.state().view.next_url.as_deref(), Some(next.as_str()));
    assert_eq!(fetcher.call_count(FIRST_PAGE), 1);
}

#[test]
fn plain_http_next_url_is_upgraded() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let insecure = "http://fide-players.fly.dev/players/players.json?_next=20";
    let secure = "https://fide-players.fly.dev/players/players.json?_next=20";
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(FIRST_PAGE, players_page(1..21, Some(insecure)))
            .with_page(secure, players_page(21..22, None)),
    );
    let controller = started_controller(&fetcher, &MemoryAddressBar::default());

    assert_eq!(controller.state().view.next_url.as_deref(), Some(secure));
    assert_eq!(fetcher.call_count(secure), 1);
    assert_eq!(fetcher.call_count(insecure), 0);
    assert!(controller.state().cache.contains(secure));
}

#[test]
fn empty_result_has_no_next_page() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new().with_page(FIRST_PAGE, players_page(0..0, None)));
    let mut controller = started_controller(&fetcher, &MemoryAddressBar::default());

    assert!(controller.state().view.rows.is_empty());
    assert_eq!(controller.state().view.next_url, None);

    controller.update(Message::NextPage);
    assert_eq!(controller.state().navigator.depth(), 1);
    assert_eq!(fetcher.calls().len(), 1);
}

#[test]
fn failed_prefetch_is_dropped() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let next = page_url(20);
    let fetcher = Arc::new(
        StubFetcher::new().with_page(FIRST_PAGE, players_page(1..21, Some(&next))),
    );
    fetcher.set_result(&next, Err(FetchError::Network("connection reset".to_string())));
    let mut controller = started_controller(&fetcher, &MemoryAddressBar::default());

    assert!(!controller.state().cache.contains(&next));
    assert_eq!(
        controller.state().view.status,
        LoadStatus::Loaded {
            url: FIRST_PAGE.to_string()
        }
    );

    // Going forward now issues a live request, which fails visibly.
    controller.update(Message::NextPage);
    wait_for_idle(&mut controller);
    assert_eq!(
        controller.state().view.status,
        LoadStatus::Failed {
            url: next.clone(),
            error: FetchError::Network("connection reset".to_string()),
        }
    );
    assert_eq!(row_ids(&controller), (1..21).collect::<Vec<_>>());
}

#[test]
fn http_error_fails_and_retry_recovers() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.set_result(FIRST_PAGE, Err(FetchError::UnexpectedStatus(500)));
    let mut controller = started_controller(&fetcher, &MemoryAddressBar::default());

    assert_eq!(
        controller.state().view.error(),
        Some(&FetchError::UnexpectedStatus(500))
    );

    fetcher.set_result(FIRST_PAGE, Ok(players_page(1..5, None)));
    controller.update(Message::Retry);
    assert!(controller.state().view.is_loading());
    wait_for_idle(&mut controller);

    assert_eq!(row_ids(&controller), vec![1, 2, 3, 4]);
    assert_eq!(controller.state().navigator.depth(), 1);
    assert_eq!(fetcher.call_count(FIRST_PAGE), 2);
}

#[test]
fn failure_of_previous_query_is_not_retried_after_new_search() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.set_result(FIRST_PAGE, Err(FetchError::UnexpectedStatus(500)));
    let mut config = test_config();
    config.behavior.search_debounce_ms = 60_000;
    let address_bar = MemoryAddressBar::default();
    let mut controller = controller_with(config, &fetcher, &address_bar);
    controller.start();
    wait_until(&mut controller, "failure", |c| c.state().view.error().is_some());
    fetcher.set_result(FIRST_PAGE, Ok(players_page(1..5, None)));

    controller.update(Message::SetSearchText("carlsen".to_string()));
    assert_eq!(controller.state().view.status, LoadStatus::Idle);

    controller.update(Message::Retry);

    let state = controller.state();
    assert_eq!(state.view.status, LoadStatus::Idle);
    assert!(state.view.rows.is_empty());
    assert!(state.cache.is_empty());
    assert_eq!(state.navigator.depth(), 0);
    assert_eq!(fetcher.call_count(FIRST_PAGE), 1);
    assert_eq!(address_bar.writes(), vec!["sort=fideid&order=asc".to_string()]);
}

#[test]
fn revisiting_a_page_does_not_repeat_its_prefetch() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let second = page_url(20);
    let third = page_url(40);
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(FIRST_PAGE, players_page(1..21, Some(&second)))
            .with_page(&second, players_page(21..41, Some(&third)))
            .with_page(&third, players_page(41..45, None)),
    );
    let third_hold = fetcher.hold(&third);
    let mut controller = controller_with(test_config(), &fetcher, &MemoryAddressBar::default());
    controller.start();
    wait_until(&mut controller, "second page cached", |c| {
        c.state().cache.contains(&second)
    });

    // Each cached page shown again asks for its successor again.
    controller.update(Message::NextPage);
    assert!(controller.is_prefetching(&third));
    controller.update(Message::PreviousPage);
    controller.update(Message::NextPage);

    assert_eq!(row_ids(&controller), (21..41).collect::<Vec<_>>());
    assert_eq!(fetcher.call_count(&third), 1);
    assert!(controller.is_prefetching(&third));

    third_hold.release();
    wait_for_idle(&mut controller);
    assert!(!controller.is_prefetching(&third));
    assert!(controller.state().cache.contains(&third));
    assert_eq!(fetcher.call_count(&third), 1);
}

#[test]
fn retry_without_failure_does_nothing() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new().with_page(FIRST_PAGE, players_page(1..5, None)));
    let mut controller = started_controller(&fetcher, &MemoryAddressBar::default());

    controller.update(Message::Retry);
    assert!(!controller.has_pending_work());
    assert_eq!(fetcher.call_count(FIRST_PAGE), 1);
}

#[test]
fn slow_request_times_out_and_late_answer_is_cached() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new().with_page(FIRST_PAGE, players_page(1..5, None)));
    let hold = fetcher.hold(FIRST_PAGE);
    let mut config = test_config();
    config.behavior.fetch_timeout_ms = 30;
    let mut controller = controller_with(config, &fetcher, &MemoryAddressBar::default());

    controller.start();
    wait_until(&mut controller, "timeout", |c| c.state().view.error().is_some());
    assert_eq!(
        controller.state().view.error(),
        Some(&FetchError::TimedOut(30))
    );
    assert!(controller.state().view.rows.is_empty());

    // The answer arrives after the timeout. It is not shown but kept for the retry.
    hold.release();
    wait_for_idle(&mut controller);
    assert!(controller.state().view.rows.is_empty());
    assert!(controller.state().cache.contains(FIRST_PAGE));

    controller.update(Message::Retry);
    assert_eq!(row_ids(&controller), vec![1, 2, 3, 4]);
    assert_eq!(fetcher.call_count(FIRST_PAGE), 1);
}

#[test]
fn superseded_response_is_discarded() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let by_rating = FIRST_PAGE.replace("_sort=fideid", "_sort=rating");
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(FIRST_PAGE, players_page(1..21, None))
            .with_page(&by_rating, players_page(100..120, None)),
    );
    let hold = fetcher.hold(FIRST_PAGE);
    let mut controller =
        controller_with(test_config(), &fetcher, &MemoryAddressBar::default());

    controller.start();
    controller.update(Message::SortBy("rating".to_string()));
    wait_until(&mut controller, "sorted page", |c| {
        !c.state().view.rows.is_empty()
    });
    assert_eq!(row_ids(&controller), (100..120).collect::<Vec<_>>());

    hold.release();
    wait_for_idle(&mut controller);

    assert_eq!(row_ids(&controller), (100..120).collect::<Vec<_>>());
    assert_eq!(
        controller.state().view.status,
        LoadStatus::Loaded {
            url: by_rating.clone()
        }
    );
    // Issued before the query reset, so it must not repopulate the cache either.
    assert!(!controller.state().cache.contains(FIRST_PAGE));
}

#[test]
fn address_bar_restores_the_view_on_start() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let query = "country=France&search=magnus&sort=rating&order=desc";
    let expected = FIRST_PAGE.replace(
        "_sort=fideid",
        "country__exact=France&_search=magnus&_sort_desc=rating",
    );
    let next = format!("{expected}&_next=20");
    let fetcher = Arc::new(
        StubFetcher::new()
            .with_page(&expected, players_page(1..21, Some(&next)))
            .with_page(&next, players_page(21..30, None)),
    );
    let address_bar = MemoryAddressBar::new(query);
    let mut controller = started_controller(&fetcher, &address_bar);

    assert_eq!(fetcher.calls()[0], expected);
    assert_eq!(address_bar.writes(), vec![query.to_string()]);

    // Paging never touches the address bar.
    controller.update(Message::NextPage);
    controller.update(Message::PreviousPage);
    assert_eq!(address_bar.writes().len(), 1);
}

#[test]
fn every_new_query_writes_the_address_bar_once() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new());
    let address_bar = MemoryAddressBar::default();
    let mut controller = started_controller(&fetcher, &address_bar);

    controller.update(Message::SortBy("name".to_string()));
    wait_for_idle(&mut controller);
    controller.update(Message::SetCountry(Some("NOR".to_string())));
    wait_for_idle(&mut controller);

    assert_eq!(
        address_bar.writes(),
        vec![
            "sort=fideid&order=asc".to_string(),
            "sort=name&order=asc".to_string(),
            "country=NOR&sort=name&order=asc".to_string(),
        ]
    );
}

#[test]
fn selecting_a_player_calls_back() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new().with_page(FIRST_PAGE, players_page(1..3, None)));
    let selected = Arc::new(Mutex::new(vec![]));
    let selected_in_callback = selected.clone();
    let mut controller = controller_with(test_config(), &fetcher, &MemoryAddressBar::default())
        .with_selection_callback(Box::new(move |player: &Player| {
            selected_in_callback
                .lock()
                .expect("selected")
                .push(player.fideid);
        }));
    controller.start();
    wait_for_idle(&mut controller);

    let player = controller.state().view.rows[1].clone();
    controller.update(Message::SelectPlayer(player));

    assert_eq!(controller.state().selected, Some(PlayerId(2)));
    assert_eq!(*selected.lock().expect("selected"), vec![PlayerId(2)]);
}

#[test]
fn newer_toast_outlives_older_hide_timer() {
    let runtime = test_runtime();
    let _guard = runtime.enter();
    let fetcher = Arc::new(StubFetcher::new());
    let mut controller = controller_with(test_config(), &fetcher, &MemoryAddressBar::default());

    controller.update(Message::ShowToast);
    controller.update(Message::ShowToast);
    assert!(controller.state().view.toast_visible);

    controller.update(Message::HideToast { ticket: 1 });
    assert!(controller.state().view.toast_visible);
    controller.update(Message::HideToast { ticket: 2 });
    assert!(!controller.state().view.toast_visible);

    controller.update(Message::ShowToast);
    wait_until(&mut controller, "toast to hide", |c| {
        !c.state().view.toast_visible
    });
}

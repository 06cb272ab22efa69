use fide_server::{Player, PlayersPage};

use crate::remote::FetchError;

#[derive(Debug, Clone)]
pub enum Message {
    /// Restrict the table to one country, `None` shows all countries.
    SetCountry(Option<String>),
    SetSearchText(String),
    /// Sort by a column. Repeating the current column flips the direction.
    SortBy(String),
    NextPage,
    PreviousPage,
    /// Re-issue the request that failed.
    Retry,
    SelectPlayer(Player),
    ShowToast,

    // Completions of background work
    CountriesLoaded(Result<Vec<String>, FetchError>),
    PageFetched {
        url: String,
        epoch: u64,
        generation: u64,
        result: Result<PlayersPage, FetchError>,
    },
    PagePrefetched {
        url: String,
        generation: u64,
        result: Result<PlayersPage, FetchError>,
    },
    SearchDebounceElapsed {
        ticket: u64,
    },
    FetchTimedOut {
        epoch: u64,
    },
    HideToast {
        ticket: u64,
    },
}

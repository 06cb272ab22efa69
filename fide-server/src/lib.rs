//! Wire types of the player query API and the development server serving it.
use serde::{Deserialize, Serialize};

mod player_list;
#[cfg(not(target_arch = "wasm32"))]
mod server;

pub use player_list::{PlayerListError, load_player_list, parse_player_json, parse_player_xml};
#[cfg(not(target_arch = "wasm32"))]
pub use server::{ServerStartedFlag, serve_players, server_main};

pub const HTTP_SERVER_KEY: &str = "Server";
pub const HTTP_SERVER_VALUE_FIDE: &str = "fide-server";
pub const X_FIDE_SERVER_VERSION: &str = "x-fide-server-version";
pub const FIDE_SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path of the paginated player table.
pub const PLAYERS_TABLE_PATH: &str = "/players/players.json";
/// Path of the database-level query endpoint (used for the country list).
pub const PLAYERS_DATABASE_PATH: &str = "/players.json";

/// Page size used when the request does not carry `_size`.
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Query parameter names understood by the table endpoint.
pub mod params {
    pub const SIZE: &str = "_size";
    pub const EXTRA: &str = "_extra";
    pub const EXTRA_NEXT_URL: &str = "next_url";
    pub const COUNTRY_EXACT: &str = "country__exact";
    pub const SEARCH: &str = "_search";
    pub const SORT: &str = "_sort";
    pub const SORT_DESC: &str = "_sort_desc";
    pub const NEXT: &str = "_next";
    pub const SQL: &str = "sql";
}

/// Stable player identity (the FIDE id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the player table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub fideid: PlayerId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub w_title: Option<String>,
    #[serde(default)]
    pub o_title: Option<String>,
    #[serde(default)]
    pub foa_title: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub games: Option<i64>,
    #[serde(default)]
    pub k: Option<i64>,
    #[serde(default)]
    pub rapid_rating: Option<i64>,
    #[serde(default)]
    pub rapid_games: Option<i64>,
    #[serde(default)]
    pub rapid_k: Option<i64>,
    #[serde(default)]
    pub blitz_rating: Option<i64>,
    #[serde(default)]
    pub blitz_games: Option<i64>,
    #[serde(default)]
    pub blitz_k: Option<i64>,
    #[serde(default)]
    pub birthday: Option<i64>,
    #[serde(default)]
    pub flag: Option<String>,
}

impl Player {
    /// A player with only an id and a country, everything else unknown.
    #[must_use]
    pub fn new(fideid: u64, country: Option<&str>) -> Self {
        Self {
            fideid: PlayerId(fideid),
            name: None,
            country: country.map(str::to_string),
            sex: None,
            title: None,
            w_title: None,
            o_title: None,
            foa_title: None,
            rating: None,
            games: None,
            k: None,
            rapid_rating: None,
            rapid_games: None,
            rapid_k: None,
            blitz_rating: None,
            blitz_games: None,
            blitz_k: None,
            birthday: None,
            flag: None,
        }
    }

    /// Sort key of the named column, `None` if the column does not exist.
    #[must_use]
    pub fn sort_key(&self, column: &str) -> Option<PlayerSortKey> {
        let text = |value: &Option<String>| {
            value
                .as_ref()
                .map_or(PlayerSortKey::None, |s| PlayerSortKey::Text(s.clone()))
        };
        let numeric =
            |value: Option<i64>| value.map_or(PlayerSortKey::None, PlayerSortKey::Numeric);
        let key = match column {
            "fideid" => PlayerSortKey::Numeric(self.fideid.0 as i64),
            "name" => text(&self.name),
            "country" => text(&self.country),
            "sex" => text(&self.sex),
            "title" => text(&self.title),
            "w_title" => text(&self.w_title),
            "o_title" => text(&self.o_title),
            "foa_title" => text(&self.foa_title),
            "rating" => numeric(self.rating),
            "games" => numeric(self.games),
            "k" => numeric(self.k),
            "rapid_rating" => numeric(self.rapid_rating),
            "rapid_games" => numeric(self.rapid_games),
            "rapid_k" => numeric(self.rapid_k),
            "blitz_rating" => numeric(self.blitz_rating),
            "blitz_games" => numeric(self.blitz_games),
            "blitz_k" => numeric(self.blitz_k),
            "birthday" => numeric(self.birthday),
            "flag" => text(&self.flag),
            _ => return None,
        };
        Some(key)
    }
}

/// Comparable value of one column. Missing values sort after everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSortKey {
    Numeric(i64),
    Text(String),
    None,
}

impl PlayerSortKey {
    fn rank(&self) -> u8 {
        match self {
            PlayerSortKey::Numeric(_) => 0,
            PlayerSortKey::Text(_) => 1,
            PlayerSortKey::None => 2,
        }
    }
}

impl Ord for PlayerSortKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (PlayerSortKey::Numeric(left), PlayerSortKey::Numeric(right)) => left.cmp(right),
            (PlayerSortKey::Text(left), PlayerSortKey::Text(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for PlayerSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One page of the player table as returned by the table endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayersPage {
    pub rows: Vec<Player>,
    #[serde(default)]
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRow {
    #[serde(default)]
    pub country: Option<String>,
}

/// Result of the distinct-country query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountriesResponse {
    pub rows: Vec<CountryRow>,
}

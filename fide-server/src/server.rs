//! Handling of external communication in the development server.
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::{Context, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{
    CountriesResponse, CountryRow, DEFAULT_PAGE_SIZE, FIDE_SERVER_VERSION, HTTP_SERVER_KEY,
    HTTP_SERVER_VALUE_FIDE, MAX_PAGE_SIZE, PLAYERS_DATABASE_PATH, PLAYERS_TABLE_PATH, Player,
    PlayersPage, X_FIDE_SERVER_VERSION, load_player_list, params,
};

struct ServerState {
    source: String,
    players: Vec<Player>,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum QueryError {
    #[error("Invalid value for {param}: {value}")]
    InvalidNumber { param: &'static str, value: String },
    #[error("Cannot sort table by {0}")]
    UnknownColumn(String),
    #[error("Unsupported query")]
    UnsupportedQuery,
}

#[derive(Debug, PartialEq, Eq)]
struct TableQuery {
    size: usize,
    want_next_url: bool,
    country: Option<String>,
    search_terms: Vec<String>,
    sort_column: String,
    ascending: bool,
    offset: usize,
}

fn parse_number(param: &'static str, value: &str) -> Result<usize, QueryError> {
    value.parse().map_err(|_| QueryError::InvalidNumber {
        param,
        value: value.to_string(),
    })
}

fn parse_table_query(query: &str) -> Result<TableQuery, QueryError> {
    let mut parsed = TableQuery {
        size: DEFAULT_PAGE_SIZE,
        want_next_url: false,
        country: None,
        search_terms: vec![],
        sort_column: "fideid".to_string(),
        ascending: true,
        offset: 0,
    };
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            params::SIZE => {
                // An empty page could never advance the continuation offset.
                let size = parse_number(params::SIZE, &value)?;
                if size == 0 {
                    return Err(QueryError::InvalidNumber {
                        param: params::SIZE,
                        value: value.into_owned(),
                    });
                }
                parsed.size = size.min(MAX_PAGE_SIZE);
            }
            params::EXTRA => {
                parsed.want_next_url |= value.split(',').any(|v| v == params::EXTRA_NEXT_URL);
            }
            params::COUNTRY_EXACT => parsed.country = Some(value.into_owned()),
            params::SEARCH => {
                parsed.search_terms = value
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect();
            }
            params::SORT | params::SORT_DESC => {
                parsed.sort_column = value.into_owned();
                parsed.ascending = key == params::SORT;
            }
            params::NEXT => parsed.offset = parse_number(params::NEXT, &value)?,
            _ => {}
        }
    }
    if Player::new(0, None).sort_key(&parsed.sort_column).is_none() {
        return Err(QueryError::UnknownColumn(parsed.sort_column));
    }
    Ok(parsed)
}

fn matches_query(player: &Player, query: &TableQuery) -> bool {
    if let Some(country) = &query.country
        && player.country.as_ref() != Some(country)
    {
        return false;
    }
    if query.search_terms.is_empty() {
        return true;
    }
    let Some(name) = &player.name else {
        return false;
    };
    let name = name.to_lowercase();
    query.search_terms.iter().all(|term| name.contains(term))
}

/// Missing values go last in both directions, ties are broken by ascending id.
fn compare_players(left: &Player, right: &Player, column: &str, ascending: bool) -> Ordering {
    use crate::PlayerSortKey;
    let left_key = left.sort_key(column).unwrap_or(PlayerSortKey::None);
    let right_key = right.sort_key(column).unwrap_or(PlayerSortKey::None);
    let ord = match (&left_key, &right_key) {
        (PlayerSortKey::None, PlayerSortKey::None) => Ordering::Equal,
        (PlayerSortKey::None, _) => Ordering::Greater,
        (_, PlayerSortKey::None) => Ordering::Less,
        _ if ascending => left_key.cmp(&right_key),
        _ => right_key.cmp(&left_key),
    };
    ord.then_with(|| left.fideid.cmp(&right.fideid))
}

/// Returns the requested page and the offset of the following one, if any rows remain.
fn run_table_query(players: &[Player], query: &TableQuery) -> (Vec<Player>, Option<usize>) {
    let mut selected = players
        .iter()
        .filter(|player| matches_query(player, query))
        .collect::<Vec<_>>();
    selected.sort_by(|left, right| {
        compare_players(left, right, &query.sort_column, query.ascending)
    });

    let end = query.offset.saturating_add(query.size).min(selected.len());
    let rows = selected
        .get(query.offset..end)
        .map(|rows| rows.iter().map(|&player| player.clone()).collect())
        .unwrap_or_default();
    let next = (end < selected.len()).then_some(end);
    (rows, next)
}

/// Rebuilds the request URL with `_next` pointing at `offset`.
fn next_page_url(host: &str, query: &str, offset: usize) -> Option<String> {
    let mut url = url::Url::parse(&format!("http://{host}{PLAYERS_TABLE_PATH}")).ok()?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key != params::NEXT {
                pairs.append_pair(&key, &value);
            }
        }
        pairs.append_pair(params::NEXT, &offset.to_string());
    }
    Some(url.to_string())
}

fn distinct_countries(players: &[Player]) -> CountriesResponse {
    let countries = players
        .iter()
        .filter_map(|player| player.country.clone())
        .collect::<BTreeSet<_>>();
    CountriesResponse {
        rows: countries
            .into_iter()
            .map(|country| CountryRow {
                country: Some(country),
            })
            .collect(),
    }
}

fn get_info_page(state: &ServerState) -> String {
    format!(
        r#"
    <!DOCTYPE html><html lang="en">
    <head>
    <title>fide-server</title>
    </head>
    <body>
    <h1>fide-server</h1>
    <b>Version:</b> {FIDE_SERVER_VERSION}<br>
    <b>Player list:</b> {}<br>
    <b>Players:</b> {}<br>
    <b>Table:</b> <a href="{PLAYERS_TABLE_PATH}">{PLAYERS_TABLE_PATH}</a>
    </body></html>
    "#,
        state.source,
        state.players.len()
    )
}

const CONTENT_TYPE: &str = "Content-Type";
const JSON_MIME: &str = "application/json";
const HTML_MIME: &str = "text/html; charset=utf-8";

trait DefaultHeader {
    fn default_header(self) -> Self;
}

impl DefaultHeader for hyper::http::response::Builder {
    fn default_header(self) -> Self {
        self.header(HTTP_SERVER_KEY, HTTP_SERVER_VALUE_FIDE)
            .header(X_FIDE_SERVER_VERSION, FIDE_SERVER_VERSION)
            .header("Cache-Control", "no-cache")
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Result<Response<Full<Bytes>>> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_MIME)
        .default_header()
        .body(Full::from(body))?)
}

fn bad_request(err: &QueryError) -> Result<Response<Full<Bytes>>> {
    warn!("Rejected query: {err}");
    let body = serde_json::to_vec(&ErrorBody {
        ok: false,
        error: err.to_string(),
    })?;
    json_response(StatusCode::BAD_REQUEST, body)
}

fn handle_table(state: &ServerState, host: &str, query: &str) -> Result<Response<Full<Bytes>>> {
    let parsed = match parse_table_query(query) {
        Ok(parsed) => parsed,
        Err(err) => return bad_request(&err),
    };
    let (rows, next) = run_table_query(&state.players, &parsed);
    let next_url = match next {
        Some(offset) if parsed.want_next_url => next_page_url(host, query, offset),
        _ => None,
    };
    let row_count = rows.len();
    let body = serde_json::to_vec(&PlayersPage { rows, next_url })?;
    info!(
        "Sending {row_count} players ({})",
        bytesize::ByteSize::b(body.len() as u64)
    );
    json_response(StatusCode::OK, body)
}

fn handle_database(state: &ServerState, query: &str) -> Result<Response<Full<Bytes>>> {
    let has_sql = url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == params::SQL);
    if !has_sql {
        return bad_request(&QueryError::UnsupportedQuery);
    }
    let body = serde_json::to_vec(&distinct_countries(&state.players))?;
    json_response(StatusCode::OK, body)
}

async fn handle(
    state: Arc<ServerState>,
    fallback_host: Arc<String>,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>> {
    let host = req
        .headers()
        .get(hyper::header::HOST)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| fallback_host.as_str().to_string(), str::to_string);
    let query = req.uri().query().unwrap_or("");

    match req.uri().path() {
        PLAYERS_TABLE_PATH => handle_table(&state, &host, query),
        PLAYERS_DATABASE_PATH => handle_database(&state, query),
        "/" => Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, HTML_MIME)
            .default_header()
            .body(Full::from(get_info_page(&state)))?),
        path => {
            warn!("Received request for unknown path: {path}");
            json_response(StatusCode::NOT_FOUND, vec![])
        }
    }
}

pub type ServerStartedFlag = Arc<AtomicBool>;

/// Loads `player_file` and serves it until the task is dropped.
pub async fn server_main(
    port: u16,
    bind_address: String,
    player_file: &Path,
    started: Option<ServerStartedFlag>,
) -> Result<()> {
    let players = load_player_list(player_file)
        .with_context(|| format!("Failed to load player list: {}", player_file.display()))?;
    serve_players(
        port,
        bind_address,
        player_file.display().to_string(),
        players,
        started,
    )
    .await
}

/// Serves an already loaded player list.
pub async fn serve_players(
    port: u16,
    bind_address: String,
    source: String,
    players: Vec<Player>,
    started: Option<ServerStartedFlag>,
) -> Result<()> {
    let ip_addr: std::net::IpAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {bind_address}"))?;
    if bind_address != "127.0.0.1" {
        warn!("Server is binding to {bind_address} instead of 127.0.0.1 (localhost)");
        warn!("This may make the server accessible from external networks");
    }

    let addr = SocketAddr::new(ip_addr, port);
    let state = Arc::new(ServerState { source, players });
    let fallback_host = Arc::new(addr.to_string());

    info!("Starting server on {addr}. To use:");
    info!("   fide-browser --players-url http://{addr}{PLAYERS_TABLE_PATH}");

    let listener = TcpListener::bind(&addr).await?;

    if let Some(started) = started {
        started.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let state = state.clone();
        let fallback_host = fallback_host.clone();
        tokio::task::spawn(async move {
            let service =
                service_fn(move |req| handle(state.clone(), fallback_host.clone(), req));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("server error: {e}");
            }
        });
    }
}

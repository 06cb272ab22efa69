//! Loading of the FIDE player list served by the development server.
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{Player, PlayerId};

#[derive(Debug, Error)]
pub enum PlayerListError {
    #[error("Failed to read player list {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid XML player list: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("Invalid JSON player list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported player list format: {0} (expected .xml or .json)")]
    UnsupportedFormat(String),
}

/// Raw `<player>` element. Every field is text, empty elements carry no value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct XmlPlayer {
    fideid: Option<String>,
    name: Option<String>,
    country: Option<String>,
    sex: Option<String>,
    title: Option<String>,
    w_title: Option<String>,
    o_title: Option<String>,
    foa_title: Option<String>,
    rating: Option<String>,
    games: Option<String>,
    k: Option<String>,
    rapid_rating: Option<String>,
    rapid_games: Option<String>,
    rapid_k: Option<String>,
    blitz_rating: Option<String>,
    blitz_games: Option<String>,
    blitz_k: Option<String>,
    birthday: Option<String>,
    flag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlPlayersList {
    #[serde(rename = "player", default)]
    players: Vec<XmlPlayer>,
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Only plain digit strings are numbers; anything else is treated as missing.
fn integer(value: Option<&String>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

impl XmlPlayer {
    fn into_player(self) -> Option<Player> {
        let fideid = integer(self.fideid.as_ref())?;
        Some(Player {
            fideid: PlayerId(fideid as u64),
            rating: integer(self.rating.as_ref()),
            games: integer(self.games.as_ref()),
            k: integer(self.k.as_ref()),
            rapid_rating: integer(self.rapid_rating.as_ref()),
            rapid_games: integer(self.rapid_games.as_ref()),
            rapid_k: integer(self.rapid_k.as_ref()),
            blitz_rating: integer(self.blitz_rating.as_ref()),
            blitz_games: integer(self.blitz_games.as_ref()),
            blitz_k: integer(self.blitz_k.as_ref()),
            birthday: integer(self.birthday.as_ref()),
            name: text(self.name),
            country: text(self.country),
            sex: text(self.sex),
            title: text(self.title),
            w_title: text(self.w_title),
            o_title: text(self.o_title),
            foa_title: text(self.foa_title),
            flag: text(self.flag),
        })
    }
}

/// Parses a FIDE `<playerslist>` document. Players without a numeric id are skipped.
pub fn parse_player_xml(xml: &str) -> Result<Vec<Player>, PlayerListError> {
    let list: XmlPlayersList = quick_xml::de::from_str(xml)?;
    let total = list.players.len();
    let players = list
        .players
        .into_iter()
        .filter_map(XmlPlayer::into_player)
        .collect::<Vec<_>>();
    if players.len() != total {
        warn!(
            "Skipped {} players without a valid fideid",
            total - players.len()
        );
    }
    Ok(players)
}

pub fn parse_player_json(json: &str) -> Result<Vec<Player>, PlayerListError> {
    Ok(serde_json::from_str(json)?)
}

/// Loads a player list, choosing the parser by file extension.
pub fn load_player_list(path: &Path) -> Result<Vec<Player>, PlayerListError> {
    let start = web_time::Instant::now();
    let content = std::fs::read_to_string(path).map_err(|source| PlayerListError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let players = match extension.as_deref() {
        Some("xml") => parse_player_xml(&content)?,
        Some("json") => parse_player_json(&content)?,
        _ => return Err(PlayerListError::UnsupportedFormat(path.display().to_string())),
    };
    info!(
        "Loaded {} players from {} in {:?}",
        players.len(),
        path.display(),
        start.elapsed()
    );
    Ok(players)
}

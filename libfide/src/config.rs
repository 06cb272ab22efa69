#[cfg(not(target_arch = "wasm32"))]
use config::Config;
#[cfg(not(target_arch = "wasm32"))]
use config::{Environment, File};
#[cfg(not(target_arch = "wasm32"))]
use directories::ProjectDirs;
use eyre::Result;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use std::sync::LazyLock;

#[cfg(not(target_arch = "wasm32"))]
pub static PROJECT_DIR: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "fide-browser", "fide"));
#[cfg(not(target_arch = "wasm32"))]
const CONFIG_FILE: &str = "config.toml";
#[cfg(not(target_arch = "wasm32"))]
pub const LOCAL_DIR: &str = ".fide";

const DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct FideConfig {
    pub api: ApiConfig,
    pub behavior: BehaviorConfig,
    /// Development server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the paginated player table
    pub players_url: String,
    /// Full URL of the distinct-country read
    pub countries_url: String,
    pub page_size: usize,
    /// Rewrite `http://` continuation links to `https://`
    pub upgrade_next_url_scheme: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BehaviorConfig {
    pub default_sort_key: String,
    pub search_debounce_ms: u64,
    pub fetch_timeout_ms: u64,
    pub toast_duration_ms: u64,
    /// Maximum number of cached pages, `0` means unbounded
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl FideConfig {
    #[cfg(target_arch = "wasm32")]
    pub fn new(_force_default_config: bool) -> Result<Self> {
        Self::new_from_toml(DEFAULT_CONFIG)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(force_default_config: bool) -> eyre::Result<Self> {
        use eyre::anyhow;

        let mut config = Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));

        let config = if force_default_config {
            config
        } else {
            if let Some(proj_dirs) = &*PROJECT_DIR {
                let config_file = proj_dirs.config_dir().join(CONFIG_FILE);
                config = config.add_source(File::from(config_file).required(false));
            }

            // Add configs from most top-level to most local so that a nearby `.fide`
            // directory overrides settings further up.
            find_local_configs()
                .into_iter()
                .fold(config, |c, p| {
                    c.add_source(File::from(p.join(CONFIG_FILE)).required(false))
                })
                .add_source(
                    Environment::with_prefix("fide")
                        .prefix_separator("_")
                        .separator("__"),
                )
        };

        config
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!("Failed to parse config {e}"))
    }

    pub fn new_from_toml(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }

    /// The built-in configuration, ignoring user files and the environment.
    pub fn new_default() -> Result<Self> {
        Self::new_from_toml(DEFAULT_CONFIG)
    }
}

/// Returns the paths matching `item` in `start` and each of its ancestors, closest first.
#[cfg(not(target_arch = "wasm32"))]
pub fn search_upward(start: impl AsRef<Path>, item: impl AsRef<Path>) -> Vec<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .map(|p| p.join(&item))
        .filter(|p| p.try_exists().is_ok_and(std::convert::identity))
        .collect()
}

/// Searches for `.fide` directories upward from the current location. Results are ordered
/// from most top-level to most local; plain files are ignored.
#[cfg(not(target_arch = "wasm32"))]
fn find_local_configs() -> Vec<PathBuf> {
    match std::env::current_dir() {
        Ok(dir) => search_upward(dir, LOCAL_DIR)
            .into_iter()
            .filter(|p| p.is_dir())
            .rev()
            .collect(),
        Err(_) => vec![],
    }
}

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Local development node.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9933";
/// Public IPFS gateway.
pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";
/// Crust gateway, the default for resolving creatives.
pub const CRUST_GATEWAY: &str = "https://crustgateway.io/ipfs/";

const DEFAULT_SCAN_LIMIT: u32 = 100;
const DEFAULT_MIN_VIEW_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Chain JSON-RPC endpoint.
    pub endpoint: String,
    /// Gateway prefix the creative CID is appended to.
    pub gateway: String,
    /// Upper bound of the sequential ad-id scan. The chain exposes no
    /// "list active ads" query, so records with ids at or beyond the bound
    /// are never considered.
    pub scan_limit: u32,
    /// Minimum dwell time before a view can be verified, in milliseconds.
    pub min_view_ms: u64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            gateway: CRUST_GATEWAY.into(),
            scan_limit: DEFAULT_SCAN_LIMIT,
            min_view_ms: DEFAULT_MIN_VIEW_MS,
        }
    }
}

impl SnapConfig {
    pub fn min_view_duration(&self) -> Duration {
        Duration::from_millis(self.min_view_ms)
    }

    /// Resolve a creative CID to a playable URL.
    pub fn video_url(&self, cid: &str) -> String {
        format!("{}{}", self.gateway, cid)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut dir| {
        dir.push(".polkaads");
        dir.push("snap.toml");
        dir
    })
}

/// Load the user configuration file, falling back to defaults when it does
/// not exist, then apply `POLKAADS_*` environment overrides.
pub fn load_user_config() -> io::Result<SnapConfig> {
    let mut config = match config_path() {
        Some(path) => load_from(&path)?,
        None => SnapConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

fn load_from(path: &Path) -> io::Result<SnapConfig> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            toml::from_str(&contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(SnapConfig::default()),
        Err(err) => Err(err),
    }
}

fn apply_env_overrides(config: &mut SnapConfig) {
    if let Ok(endpoint) = env::var("POLKAADS_RPC_ENDPOINT") {
        config.endpoint = endpoint;
    }
    if let Ok(gateway) = env::var("POLKAADS_GATEWAY") {
        config.gateway = gateway;
    }
    if let Some(limit) = env::var("POLKAADS_SCAN_LIMIT")
        .ok()
        .and_then(|raw| raw.parse().ok())
    {
        config.scan_limit = limit;
    }
    if let Some(ms) = env::var("POLKAADS_MIN_VIEW_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
    {
        config.min_view_ms = ms;
    }
}

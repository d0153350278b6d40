//! Typed access to the PolkaAds chain.
//!
//! The snap core consumes the chain exclusively through the [`ChainQuery`]
//! trait; [`ChainClient`] is the JSON-RPC implementation of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod rpc;

pub use rpc::ChainClient;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain endpoint unreachable: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("failed to decode chain response: {0}")]
    Decode(String),
}

/// Snapshot of one advertiser-funded campaign as stored on chain.
///
/// Budgets are `u128` in the smallest unit; on the wire they travel as
/// decimal strings because JSON numbers cannot carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdRecord {
    pub ad_id: u32,
    pub name: String,
    pub description: String,
    pub ipfs_cid: String,
    pub advertiser: String,
    #[serde(with = "budget_serde")]
    pub funding: u128,
    #[serde(with = "budget_serde")]
    pub remaining_budget: u128,
    #[serde(default)]
    pub views: u64,
    pub active: bool,
    /// Gateway URL for the creative, filled in by the selector.
    #[serde(default)]
    pub video_url: String,
}

impl AdRecord {
    /// Only active campaigns with budget left may be shown.
    pub fn is_eligible(&self) -> bool {
        self.active && self.remaining_budget > 0
    }

    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = url.into();
        self
    }
}

/// Read/submit surface of the external chain consumed by the snap core.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Establish (or re-establish) the underlying connection.
    async fn connect(&self) -> Result<(), ChainError> {
        Ok(())
    }

    /// Fetch the ad record stored under `ad_id`, if any.
    async fn ad(&self, ad_id: u32) -> Result<Option<AdRecord>, ChainError>;

    /// Pending fee-sponsorship request id for `account`, if one exists.
    async fn pending_sponsorship(&self, account: &str) -> Result<Option<u32>, ChainError>;

    /// Submit a SCALE-encoded extrinsic (hex), returning its hash.
    async fn submit_extrinsic(&self, call_hex: &str) -> Result<String, ChainError>;
}

mod budget_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

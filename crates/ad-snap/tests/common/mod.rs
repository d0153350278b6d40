#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use ad_snap::config::SnapConfig;
use async_trait::async_trait;
use chain_client::{AdRecord, ChainError, ChainQuery};

/// In-process chain double: a fixed set of ad records and pending
/// sponsorships, with optional failure injection.
#[derive(Default)]
pub struct MockChain {
    ads: HashMap<u32, AdRecord>,
    pending: HashMap<String, u32>,
    fail_from: Option<u32>,
    offline: bool,
    ad_fetches: AtomicU32,
    sponsorship_lookups: AtomicU32,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ad(mut self, ad: AdRecord) -> Self {
        self.ads.insert(ad.ad_id, ad);
        self
    }

    pub fn with_pending(mut self, account: &str, request_id: u32) -> Self {
        self.pending.insert(account.to_string(), request_id);
        self
    }

    /// Every `ad` fetch for ids at or beyond `ad_id` fails.
    pub fn failing_from(mut self, ad_id: u32) -> Self {
        self.fail_from = Some(ad_id);
        self
    }

    /// The chain cannot be reached at all.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn ad_fetches(&self) -> u32 {
        self.ad_fetches.load(Ordering::Relaxed)
    }

    pub fn sponsorship_lookups(&self) -> u32 {
        self.sponsorship_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn connect(&self) -> Result<(), ChainError> {
        if self.offline {
            return Err(ChainError::Connect("mock chain offline".into()));
        }
        Ok(())
    }

    async fn ad(&self, ad_id: u32) -> Result<Option<AdRecord>, ChainError> {
        self.ad_fetches.fetch_add(1, Ordering::Relaxed);
        if self.offline {
            return Err(ChainError::Connect("mock chain offline".into()));
        }
        if matches!(self.fail_from, Some(limit) if ad_id >= limit) {
            return Err(ChainError::Connect("mock storage error".into()));
        }
        Ok(self.ads.get(&ad_id).cloned())
    }

    async fn pending_sponsorship(&self, account: &str) -> Result<Option<u32>, ChainError> {
        self.sponsorship_lookups.fetch_add(1, Ordering::Relaxed);
        if self.offline {
            return Err(ChainError::Connect("mock chain offline".into()));
        }
        Ok(self.pending.get(account).copied())
    }

    async fn submit_extrinsic(&self, _call_hex: &str) -> Result<String, ChainError> {
        Ok("0x00".into())
    }
}

pub fn record(ad_id: u32, active: bool, remaining_budget: u128) -> AdRecord {
    AdRecord {
        ad_id,
        name: format!("ad-{ad_id}"),
        description: "campaign".into(),
        ipfs_cid: format!("QmCid{ad_id}"),
        advertiser: "5Advertiser".into(),
        funding: 1_000,
        remaining_budget,
        views: 0,
        active,
        video_url: String::new(),
    }
}

/// Small scan window keeps the probe loops cheap in tests.
pub fn test_config() -> SnapConfig {
    SnapConfig {
        scan_limit: 8,
        ..SnapConfig::default()
    }
}

use std::sync::Arc;

use chain_client::{AdRecord, ChainError, ChainQuery};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::SnapConfig;
use crate::TransactionContext;

/// How an id scan over the ad range ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEnd {
    /// Every id in the configured range was probed.
    RangeExhausted,
    /// A chain error ended the scan before the range was exhausted; ids at
    /// and beyond `failed_id` were not probed.
    Truncated { failed_id: u32 },
}

/// Eligible records collected by a scan, plus how the scan ended.
#[derive(Debug)]
pub struct ScanReport {
    pub eligible: Vec<AdRecord>,
    pub end: ScanEnd,
}

/// Picks one eligible ad uniformly at random from a bounded id scan.
pub struct AdSelector {
    chain: Arc<dyn ChainQuery>,
    config: SnapConfig,
}

impl AdSelector {
    pub fn new(chain: Arc<dyn ChainQuery>, config: &SnapConfig) -> Self {
        Self {
            chain,
            config: config.clone(),
        }
    }

    /// Probe ids `0..scan_limit` and collect every eligible record.
    ///
    /// A per-id fetch failure truncates the scan rather than failing it:
    /// whatever was collected before the failure is still usable for
    /// selection. Only a failure to reach the chain at all is an error.
    pub async fn scan(&self) -> Result<ScanReport, ChainError> {
        self.chain.connect().await?;
        let mut eligible = Vec::new();
        let mut end = ScanEnd::RangeExhausted;
        for ad_id in 0..self.config.scan_limit {
            match self.chain.ad(ad_id).await {
                Ok(Some(ad)) if ad.is_eligible() => eligible.push(ad),
                Ok(_) => {}
                Err(err) => {
                    warn!(ad_id, error = %err, "ad scan truncated by chain error");
                    end = ScanEnd::Truncated { failed_id: ad_id };
                    break;
                }
            }
        }
        debug!(eligible = eligible.len(), ?end, "ad scan finished");
        Ok(ScanReport { eligible, end })
    }

    /// Select one eligible ad uniformly at random, or `None` when no record
    /// is eligible. The context is logged but does not bias the pick.
    pub async fn select_ad(
        &self,
        context: &TransactionContext,
    ) -> Result<Option<AdRecord>, ChainError> {
        debug!(
            from = %context.from,
            pallet = context.pallet.as_deref().unwrap_or_default(),
            method = context.method.as_deref().unwrap_or_default(),
            "selecting ad"
        );
        let mut report = self.scan().await?;
        if report.eligible.is_empty() {
            return Ok(None);
        }
        let index = rand::thread_rng().gen_range(0..report.eligible.len());
        let ad = report.eligible.swap_remove(index);
        let url = self.config.video_url(&ad.ipfs_cid);
        Ok(Some(ad.with_video_url(url)))
    }
}

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chain_client::{AdRecord, ChainQuery};
use metrics::increment_counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SnapConfig;
use crate::selector::AdSelector;
use crate::session::{CompletionOutcome, ViewSession};
use crate::{SnapError, TransactionContext};

const MISSING_PARAMETERS: &str = "Missing parameters";
const DEFAULT_PALLET: &str = "balances";
const DEFAULT_METHOD: &str = "transfer";

/// Raw RPC request as delivered by the wallet host.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Declared call of the extrinsic being intercepted, as the host sees it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtrinsicInfo {
    pub method: Option<CallInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallInfo {
    pub section: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptResponse {
    pub should_show_ad: bool,
    pub ad: Option<AdRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipResponse {
    pub request_id: u64,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetAdResponse {
    ad: Option<AdRecord>,
    success: bool,
}

#[derive(Debug, Serialize)]
struct AckResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct FailureResponse {
    success: bool,
    error: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteViewResponse {
    verified: bool,
    view_duration: u64,
    success: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetAdParams {
    context: Option<TransactionContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ViewParams {
    ad_id: Option<u32>,
    account: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SponsorshipParams {
    account: Option<String>,
    ad_id: Option<u32>,
    fee_amount: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InterceptParams {
    extrinsic: Option<ExtrinsicInfo>,
    account: Option<String>,
}

/// Coordinates the ad flow for one requesting context.
///
/// The host creates one handler per caller and invokes it one request at a
/// time, so the view session needs no locking: every mutation happens on the
/// single logical thread between suspension points.
pub struct SnapHandler {
    config: SnapConfig,
    chain: Arc<dyn ChainQuery>,
    selector: AdSelector,
    session: ViewSession,
}

impl SnapHandler {
    pub fn new(chain: Arc<dyn ChainQuery>, config: SnapConfig) -> Self {
        let selector = AdSelector::new(chain.clone(), &config);
        Self {
            config,
            chain,
            selector,
            session: ViewSession::new(),
        }
    }

    /// Fetch an eligible ad and start a view session for it.
    pub async fn fetch_and_show(
        &mut self,
        context: &TransactionContext,
    ) -> Result<Option<AdRecord>, SnapError> {
        let ad = self.selector.select_ad(context).await?;
        if let Some(ad) = &ad {
            info!(ad_id = ad.ad_id, advertiser = %ad.advertiser, "ad view session started");
            increment_counter!("polkaads_ads_served_total");
            self.session.show(ad.clone());
        }
        Ok(ad)
    }

    /// Acknowledge that viewing has begun.
    ///
    /// On-chain recording goes through the ad-tracking pallet; submission is
    /// left to the host extension, which holds the signing keys.
    pub fn record_view(&mut self, ad_id: u32, account: &str) -> bool {
        debug!(ad_id, account, "view start acknowledged");
        true
    }

    /// Check the current session against the minimum dwell duration.
    pub fn complete_view(&mut self, ad_id: u32, account: &str) -> CompletionOutcome {
        let outcome = self.session.complete(self.config.min_view_duration());
        let view_ms = outcome.view_duration.as_millis() as u64;
        if outcome.verified {
            info!(ad_id, account, view_ms, "ad view verified");
            increment_counter!("polkaads_views_verified_total");
        } else {
            debug!(ad_id, account, view_ms, "ad view not verified");
        }
        outcome
    }

    /// Ask the chain to cover `fee_amount` for `account`'s transaction.
    ///
    /// Not yet wired to the fee-sponsorship pallet: the request always
    /// succeeds and the identifier is generated locally (milliseconds since
    /// the Unix epoch), so it carries no on-chain meaning.
    pub fn request_sponsorship(
        &mut self,
        account: &str,
        ad_id: u32,
        fee_amount: &str,
    ) -> SponsorshipResponse {
        info!(account, ad_id, fee_amount, "fee sponsorship requested");
        increment_counter!("polkaads_sponsorships_requested_total");
        let request_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        SponsorshipResponse {
            request_id,
            success: true,
        }
    }

    /// Decide whether to show an ad for the intercepted transaction.
    ///
    /// Failures convert to a "no ad" response; interception must never break
    /// the transaction it wraps.
    pub async fn intercept_transaction(
        &mut self,
        extrinsic: &ExtrinsicInfo,
        account: &str,
    ) -> InterceptResponse {
        let context = Self::context_for(extrinsic, account);
        debug!(
            from = %context.from,
            pallet = context.pallet.as_deref().unwrap_or_default(),
            method = context.method.as_deref().unwrap_or_default(),
            "intercepting transaction"
        );
        match self.selector.select_ad(&context).await {
            Ok(ad) => InterceptResponse {
                should_show_ad: ad.is_some(),
                ad,
            },
            Err(err) => {
                warn!(account, error = %err, "transaction interception failed");
                InterceptResponse {
                    should_show_ad: false,
                    ad: None,
                }
            }
        }
    }

    /// Interception gated on an existing sponsorship request: ads are only
    /// shown to accounts that have already asked for fee sponsorship.
    pub async fn intercept_for_sponsorship(
        &mut self,
        extrinsic: &ExtrinsicInfo,
        account: &str,
    ) -> InterceptResponse {
        let pending = match self.chain.pending_sponsorship(account).await {
            Ok(pending) => pending,
            Err(err) => {
                warn!(account, error = %err, "pending sponsorship lookup failed");
                return InterceptResponse {
                    should_show_ad: false,
                    ad: None,
                };
            }
        };
        match pending {
            Some(request_id) => {
                debug!(account, request_id, "pending sponsorship found");
                self.intercept_transaction(extrinsic, account).await
            }
            None => {
                debug!(account, "no pending sponsorship, skipping ad");
                InterceptResponse {
                    should_show_ad: false,
                    ad: None,
                }
            }
        }
    }

    fn context_for(extrinsic: &ExtrinsicInfo, account: &str) -> TransactionContext {
        let call = extrinsic.method.clone().unwrap_or_default();
        TransactionContext {
            from: account.to_string(),
            to: None,
            amount: None,
            pallet: Some(call.section.unwrap_or_else(|| DEFAULT_PALLET.into())),
            method: Some(call.method.unwrap_or_else(|| DEFAULT_METHOD.into())),
        }
    }

    /// Dispatch one host RPC request.
    ///
    /// Every failure resolves to a structured response; only an unknown
    /// method is raised, because it indicates a caller/protocol mismatch
    /// rather than a runtime condition.
    pub async fn handle_request(&mut self, request: RpcRequest) -> Result<Value, SnapError> {
        match request.method.as_str() {
            "polkaads_getAd" => {
                let params: GetAdParams =
                    serde_json::from_value(request.params).unwrap_or_default();
                let context = params.context.unwrap_or_default();
                let ad = match self.fetch_and_show(&context).await {
                    Ok(ad) => ad,
                    Err(err) => {
                        warn!(error = %err, "ad fetch failed");
                        None
                    }
                };
                let success = ad.is_some();
                Ok(to_response(&GetAdResponse { ad, success }))
            }
            "polkaads_recordView" => {
                let params: ViewParams = serde_json::from_value(request.params).unwrap_or_default();
                match (params.ad_id, params.account) {
                    (Some(ad_id), Some(account)) => {
                        let success = self.record_view(ad_id, &account);
                        Ok(to_response(&AckResponse { success }))
                    }
                    _ => Ok(missing_parameters()),
                }
            }
            "polkaads_completeView" => {
                let params: ViewParams = serde_json::from_value(request.params).unwrap_or_default();
                match (params.ad_id, params.account) {
                    (Some(ad_id), Some(account)) => {
                        let outcome = self.complete_view(ad_id, &account);
                        Ok(to_response(&CompleteViewResponse {
                            verified: outcome.verified,
                            view_duration: outcome.view_duration.as_millis() as u64,
                            success: outcome.verified,
                        }))
                    }
                    _ => Ok(missing_parameters()),
                }
            }
            "polkaads_requestSponsorship" => {
                let params: SponsorshipParams =
                    serde_json::from_value(request.params).unwrap_or_default();
                match (params.account, params.ad_id, params.fee_amount) {
                    (Some(account), Some(ad_id), Some(fee_amount)) => {
                        let response = self.request_sponsorship(&account, ad_id, &fee_amount);
                        Ok(to_response(&response))
                    }
                    _ => Ok(missing_parameters()),
                }
            }
            "polkaads_getAdStatus" => Ok(to_response(&self.session.status())),
            "polkaads_reset" => {
                self.session.reset();
                debug!("ad session reset");
                Ok(to_response(&AckResponse { success: true }))
            }
            "polkaads_intercept_transaction" => {
                let params: InterceptParams =
                    serde_json::from_value(request.params).unwrap_or_default();
                let extrinsic = params.extrinsic.unwrap_or_default();
                let account = params.account.unwrap_or_default();
                let response = self.intercept_transaction(&extrinsic, &account).await;
                Ok(to_response(&response))
            }
            other => Err(SnapError::MethodNotFound {
                method: other.to_string(),
            }),
        }
    }
}

fn missing_parameters() -> Value {
    to_response(&FailureResponse {
        success: false,
        error: MISSING_PARAMETERS,
    })
}

fn to_response<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("serialize rpc response")
}

//! PolkaAds wallet snap core.
//!
//! Sits between the wallet host and the chain: intercepts an outgoing
//! transaction, fetches a sponsored ad, times the view against a minimum
//! dwell duration, and (once verified) requests fee sponsorship. The host
//! drives everything through [`handler::SnapHandler`].

use chain_client::ChainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod handler;
pub mod selector;
pub mod session;

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("method not found: {method}")]
    MethodNotFound { method: String },
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Read-only description of the transaction being intercepted.
///
/// Carried for logging and future matching policies; it does not influence
/// which ad is selected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionContext {
    pub from: String,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub pallet: Option<String>,
    pub method: Option<String>,
}

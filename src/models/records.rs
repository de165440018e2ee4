//! Immutable per-event records carrying the full computed economic detail.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::display_string;
use crate::core::types::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapKind {
    Pool,
    Cove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    /// `txhash-logindex`; unique even for multi-swap transactions.
    pub id: String,
    pub transaction: String,
    pub timestamp: i64,
    pub log_index: u64,
    pub kind: SwapKind,

    pub pool: Option<String>,
    pub pair: Option<String>,
    pub transaction_source: String,

    pub in_token: String,
    pub out_token: String,
    pub sender: Address,
    pub recipient: Address,
    pub origin: Address,

    #[serde(with = "display_string")]
    pub amount_in: BigDecimal,
    #[serde(with = "display_string")]
    pub amount_out: BigDecimal,
    #[serde(with = "display_string")]
    pub amount_in_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub amount_out_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub price_per_input_token: BigDecimal,
    #[serde(with = "display_string")]
    pub price_per_output_token: BigDecimal,
    #[serde(with = "display_string")]
    pub fee_usd: BigDecimal,
}

/// One deposit observation. Asset-denominated rows (inferred from balance
/// deltas) name their token; share-denominated rows do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub timestamp: i64,
    pub transaction: String,
    pub pool: Option<String>,
    pub cove: Option<String>,
    pub token: Option<String>,
    #[serde(with = "display_string")]
    pub amount: BigDecimal,
    #[serde(with = "display_string")]
    pub amount_usd: BigDecimal,
    pub depositor: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub timestamp: i64,
    pub transaction: String,
    pub pool: Option<String>,
    pub cove: Option<String>,
    pub token: Option<String>,
    #[serde(with = "display_string")]
    pub amount: BigDecimal,
    #[serde(with = "display_string")]
    pub amount_usd: BigDecimal,
    pub withdrawer: Address,
}

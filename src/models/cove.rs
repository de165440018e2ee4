//! Cove (sub-vault) aggregates, stakes and time buckets.

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::display_string;
use crate::core::types::Address;

/// One cove, keyed by the address of the long-tail asset it wraps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cove {
    pub id: String,
    /// Long-tail asset; also the id of that Asset document.
    pub asset: String,
    pub opener: Address,
    pub opened_at: i64,
    pub transaction: String,

    // balance state
    #[serde(with = "display_string")]
    pub pool_token_amount: BigDecimal,
    #[serde(with = "display_string")]
    pub longtail_token_amount: BigDecimal,

    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
    /// Twice the pool-share leg's USD value; the long-tail leg's price is
    /// derived from that leg rather than summed independently.
    #[serde(with = "display_string")]
    pub tvl_usd: BigDecimal,

    pub swap_count: u64,
    pub deposit_count: u64,
    pub withdrawal_count: u64,
    pub unique_users: u64,
}

/// Bucketed activity for one cove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveStatus {
    pub id: String,
    pub cove: String,
    pub from: i64,
    pub to: i64,

    pub tx_count: u64,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_trade: BigDecimal,
    pub deposit_count: u64,
    pub withdrawal_count: u64,

    /// Latest implied long-tail price observed inside the bucket.
    #[serde(with = "display_string")]
    pub price: BigDecimal,
}

/// Bucketed activity across all coves combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalCoveStatus {
    pub id: String,
    pub from: i64,
    pub to: i64,

    pub tx_count: u64,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_trade: BigDecimal,
    pub deposit_count: u64,
    pub withdrawal_count: u64,

    #[serde(with = "display_string")]
    pub price: BigDecimal,
}

/// A wallet's cumulative position in one cove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCoveStake {
    pub id: String,
    pub cove: String,
    pub user: Address,
    /// Net deposited share tokens; the stake deactivates at zero.
    #[serde(with = "display_string")]
    pub deposit_tokens: BigUint,
    pub active: bool,
}

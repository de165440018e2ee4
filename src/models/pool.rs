//! Exchange pool aggregates and their time buckets.

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::display_string;

/// Lifetime aggregates for one deployed exchange pool.
///
/// Every average is recomputed from its running sum and count on update;
/// none of them is incremented independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Exchange contract address.
    pub id: String,

    // swaps
    pub tx_count: u64,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_trade: BigDecimal,
    #[serde(with = "display_string")]
    pub fee_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_trade_fee: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_fee_bps: BigDecimal,
    #[serde(with = "display_string")]
    pub revenue_usd: BigDecimal,

    // deposits
    pub deposit_count: u64,
    #[serde(with = "display_string")]
    pub deposited_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_deposit: BigDecimal,

    // withdrawals
    pub withdrawal_count: u64,
    #[serde(with = "display_string")]
    pub withdrew_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_withdraw: BigDecimal,

    #[serde(with = "display_string")]
    pub pool_tokens_supply: BigUint,
    pub unique_users: u64,
}

/// One `[from, to]` slice of pool activity. Hourly and daily variants share
/// this shape and differ only in the entity kind they are stored under;
/// bounds are immutable once the bucket exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStatus {
    pub id: String,
    pub pool: String,
    pub from: i64,
    pub to: i64,

    pub tx_count: u64,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_trade: BigDecimal,
    #[serde(with = "display_string")]
    pub fee_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_trade_fee: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_fee_bps: BigDecimal,
    #[serde(with = "display_string")]
    pub revenue_usd: BigDecimal,

    pub deposit_count: u64,
    #[serde(with = "display_string")]
    pub deposited_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_deposit: BigDecimal,

    pub withdrawal_count: u64,
    #[serde(with = "display_string")]
    pub withdrew_usd: BigDecimal,
    #[serde(with = "display_string")]
    pub avg_withdraw: BigDecimal,

    /// Mark-to-market pool liquidity observed when the bucket was created.
    #[serde(with = "display_string")]
    pub pool_value: BigDecimal,
    #[serde(with = "display_string")]
    pub pool_tokens_supply: BigUint,
}

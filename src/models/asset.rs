//! Per-asset lifetime statistics.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::display_string;

/// Whether an asset trades directly against the main pool or inside a cove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// Listed in the exchange pool; priced by oracle or fallback table.
    ShortTail,
    /// Wrapped by a cove; priced by the cove's implied valuation.
    LongTail { cove: String },
}

impl AssetKind {
    pub fn is_long_tail(&self) -> bool {
        matches!(self, AssetKind::LongTail { .. })
    }
}

// Decimal fields travel as strings: exact, and stable across storage codecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Token address in canonical form.
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    pub kind: AssetKind,

    pub tx_count: u64,
    #[serde(with = "display_string")]
    pub volume: BigDecimal,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,

    /// Latest observed on-chain balance, never a running sum.
    #[serde(with = "display_string")]
    pub tvl: BigDecimal,
    #[serde(with = "display_string")]
    pub tvl_usd: BigDecimal,

    #[serde(with = "display_string")]
    pub deposited: BigDecimal,
    #[serde(with = "display_string")]
    pub deposited_usd: BigDecimal,
}

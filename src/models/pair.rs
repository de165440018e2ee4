use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::display_string;

/// Lifetime stats for an unordered asset pair. Lookups try both orderings
/// before creating, so one document serves both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub id: String,
    pub asset0: String,
    pub asset1: String,
    pub tx_count: u64,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
}

impl Pair {
    pub fn key(asset0: &str, asset1: &str) -> String {
        format!("{asset0}-{asset1}")
    }
}

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::display_string;

/// Lifetime stats for one wallet. Created on its first observed transaction;
/// that creation is the unique-user signal the rollups consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_tx_timestamp: i64,
    pub last_tx_timestamp: i64,
    #[serde(with = "display_string")]
    pub volume_usd: BigDecimal,
    pub tx_count: u64,
}

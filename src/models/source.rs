use serde::{Deserialize, Serialize};

/// Transaction attribution by the tag carried in swap auxiliary data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSource {
    pub id: String,
    pub tx_count: u64,
}

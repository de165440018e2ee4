//! Codec for the cove controller's packed balance word.

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use num_traits::One;

use super::to_decimal;

/// Pool-share amounts are fixed 18-decimal everywhere they appear.
pub const POOL_TOKEN_DECIMALS: u32 = 18;

/// A cove's combined balance state as one 256-bit word: the high 128 bits
/// carry the pool-share amount, the low 128 bits the raw long-tail asset
/// balance in its native decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBalances {
    pub pool_tokens_raw: BigUint,
    pub asset_raw: BigUint,
}

impl PackedBalances {
    pub fn decode(packed: &BigUint) -> Self {
        let mask = (BigUint::one() << 128u32) - BigUint::one();
        Self {
            pool_tokens_raw: packed >> 128u32,
            asset_raw: packed & &mask,
        }
    }

    /// Re-packs the two halves; `decode` then `encode` round-trips
    /// bit-for-bit.
    pub fn encode(&self) -> BigUint {
        (&self.pool_tokens_raw << 128u32) | &self.asset_raw
    }

    pub fn pool_tokens(&self) -> BigDecimal {
        to_decimal(&self.pool_tokens_raw, POOL_TOKEN_DECIMALS)
    }

    pub fn asset_balance(&self, asset_decimals: u32) -> BigDecimal {
        to_decimal(&self.asset_raw, asset_decimals)
    }
}

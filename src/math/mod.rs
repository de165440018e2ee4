//! Exact decimal scaling, interval arithmetic and the packed balance codec.

mod packed;
mod time;

pub use packed::{PackedBalances, POOL_TOKEN_DECIMALS};
pub use time::{bucket_open_time, ONE_DAY, ONE_HOUR};

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::One;

/// `10^decimals` as an exact decimal.
pub fn exponent_to_decimal(decimals: u32) -> BigDecimal {
    BigDecimal::new(BigInt::one(), -i64::from(decimals))
}

/// Scales a raw integer token amount down by `10^decimals`.
///
/// Built as digits-plus-scale rather than divided, so the result is exact
/// for any amount and repeated accumulation cannot drift. `decimals == 0`
/// is the identity.
pub fn to_decimal(raw: &BigUint, decimals: u32) -> BigDecimal {
    BigDecimal::new(BigInt::from(raw.clone()), i64::from(decimals))
}

/// Signed variant for quantities that are `int256` on the wire
/// (oracle answers).
pub fn signed_to_decimal(raw: &BigInt, decimals: u32) -> BigDecimal {
    BigDecimal::new(raw.clone(), i64::from(decimals))
}

//! String-keyed entity documents materialized by the handlers.
//!
//! Entities are mutable in place and never deleted; every counter starts at
//! the additive identity so a replay from genesis reconstructs the same
//! state.

pub mod asset;
pub mod cove;
pub mod pair;
pub mod pool;
pub mod records;
pub mod source;
pub mod user;

pub use asset::{Asset, AssetKind};
pub use cove::{Cove, CoveStatus, GlobalCoveStatus, UserCoveStake};
pub use pair::Pair;
pub use pool::{Pool, PoolStatus};
pub use records::{Deposit, Swap, SwapKind, Withdrawal};
pub use source::TransactionSource;
pub use user::User;

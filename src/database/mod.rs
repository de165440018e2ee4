//! Document storage: a narrow keyed-bytes trait with RocksDB and in-memory
//! backends, plus the load-or-create accessors used by every handler.

pub mod accessors;
mod memory;
pub mod rocksdb;

pub use accessors::EntityStore;
pub use memory::MemoryStore;
pub use self::rocksdb::RocksStore;

use crate::core::error::IndexerResult;

/// Every aggregate kind the indexer materializes. Doubles as the RocksDB
/// column family name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Asset,
    Pool,
    HourlyPoolStatus,
    DailyPoolStatus,
    Cove,
    HourlyCoveStatus,
    DailyCoveStatus,
    HourlyGlobalCoveStatus,
    DailyGlobalCoveStatus,
    UserCoveStake,
    User,
    Pair,
    TransactionSource,
    Swap,
    Deposit,
    Withdrawal,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Asset => "assets",
            EntityKind::Pool => "pools",
            EntityKind::HourlyPoolStatus => "hourly_pool_statuses",
            EntityKind::DailyPoolStatus => "daily_pool_statuses",
            EntityKind::Cove => "coves",
            EntityKind::HourlyCoveStatus => "hourly_cove_statuses",
            EntityKind::DailyCoveStatus => "daily_cove_statuses",
            EntityKind::HourlyGlobalCoveStatus => "hourly_global_cove_statuses",
            EntityKind::DailyGlobalCoveStatus => "daily_global_cove_statuses",
            EntityKind::UserCoveStake => "user_cove_stakes",
            EntityKind::User => "users",
            EntityKind::Pair => "pairs",
            EntityKind::TransactionSource => "transaction_sources",
            EntityKind::Swap => "swaps",
            EntityKind::Deposit => "deposits",
            EntityKind::Withdrawal => "withdrawals",
        }
    }

    pub const fn all() -> [EntityKind; 16] {
        [
            EntityKind::Asset,
            EntityKind::Pool,
            EntityKind::HourlyPoolStatus,
            EntityKind::DailyPoolStatus,
            EntityKind::Cove,
            EntityKind::HourlyCoveStatus,
            EntityKind::DailyCoveStatus,
            EntityKind::HourlyGlobalCoveStatus,
            EntityKind::DailyGlobalCoveStatus,
            EntityKind::UserCoveStake,
            EntityKind::User,
            EntityKind::Pair,
            EntityKind::TransactionSource,
            EntityKind::Swap,
            EntityKind::Deposit,
            EntityKind::Withdrawal,
        ]
    }
}

/// Keyed byte documents. Get and put is all the engine needs: the upstream
/// feed is strictly ordered and events apply one at a time, so multi-key
/// atomicity never comes into play.
pub trait Store: Send + Sync {
    fn get_raw(&self, kind: EntityKind, key: &str) -> IndexerResult<Option<Vec<u8>>>;
    fn put_raw(&self, kind: EntityKind, key: &str, value: &[u8]) -> IndexerResult<()>;
}

//! Hourly/daily running aggregates for the pool, each cove, and all coves
//! combined.
//!
//! Buckets are created lazily on first touch, their `[from, to]` bounds
//! never change afterwards, and they only ever grow by same-bucket
//! increments. Averages are recomputed from the running sums on every
//! update.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::accounting::Accountant;
use crate::config::DeploymentConfig;
use crate::core::error::IndexerResult;
use crate::database::{EntityKind, EntityStore};
use crate::math::{bucket_open_time, ONE_DAY, ONE_HOUR};
use crate::models::{CoveStatus, GlobalCoveStatus, Pool, PoolStatus};

/// Scope id shared by the all-coves buckets.
const GLOBAL_COVE_SCOPE: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub const fn interval(self) -> i64 {
        match self {
            Granularity::Hourly => ONE_HOUR,
            Granularity::Daily => ONE_DAY,
        }
    }

    const fn pool_kind(self) -> EntityKind {
        match self {
            Granularity::Hourly => EntityKind::HourlyPoolStatus,
            Granularity::Daily => EntityKind::DailyPoolStatus,
        }
    }

    const fn cove_kind(self) -> EntityKind {
        match self {
            Granularity::Hourly => EntityKind::HourlyCoveStatus,
            Granularity::Daily => EntityKind::DailyCoveStatus,
        }
    }

    const fn global_cove_kind(self) -> EntityKind {
        match self {
            Granularity::Hourly => EntityKind::HourlyGlobalCoveStatus,
            Granularity::Daily => EntityKind::DailyGlobalCoveStatus,
        }
    }

    pub const fn both() -> [Granularity; 2] {
        [Granularity::Hourly, Granularity::Daily]
    }
}

/// What one cove event contributes to its buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoveActivity {
    Swap,
    Deposit,
    Withdrawal,
}

/// Storage id of the bucket covering `[from, to]`.
fn bucket_id(scope: &str, from: i64, to: i64) -> String {
    format!("{scope}-{from}{to}")
}

#[derive(Clone)]
pub struct Rollups {
    store: EntityStore,
    accountant: Accountant,
    config: Arc<DeploymentConfig>,
}

impl Rollups {
    pub fn new(store: EntityStore, accountant: Accountant, config: Arc<DeploymentConfig>) -> Self {
        Self {
            store,
            accountant,
            config,
        }
    }

    /// Folds one swap into the pool and its hourly/daily buckets. The
    /// fee-split revenue share is computed once per event and added to the
    /// pool and both buckets.
    pub fn record_pool_swap(
        &self,
        timestamp: i64,
        volume_usd: &BigDecimal,
        fee_usd: &BigDecimal,
        new_user: bool,
    ) -> IndexerResult<Pool> {
        let mut pool = self.store.load_pool()?;
        let supply = self.accountant.pool_token_supply()?;
        let revenue = self.revenue_share(timestamp, fee_usd, &supply)?;

        pool.tx_count += 1;
        pool.volume_usd = &pool.volume_usd + volume_usd;
        pool.avg_trade = &pool.volume_usd / BigDecimal::from(pool.tx_count);
        pool.fee_usd = &pool.fee_usd + fee_usd;
        pool.avg_trade_fee = &pool.fee_usd / BigDecimal::from(pool.tx_count);
        pool.avg_fee_bps = avg_fee_bps(&pool.fee_usd, &pool.volume_usd);
        pool.revenue_usd = &pool.revenue_usd + &revenue;
        pool.pool_tokens_supply = supply.clone();
        if new_user {
            pool.unique_users += 1;
        }

        // compute every bucket first, persist after
        let mut statuses = Vec::new();
        for granularity in Granularity::both() {
            let mut status = self.load_pool_status(&pool, timestamp, granularity)?;
            status.tx_count += 1;
            status.volume_usd = &status.volume_usd + volume_usd;
            status.avg_trade = &status.volume_usd / BigDecimal::from(status.tx_count);
            status.fee_usd = &status.fee_usd + fee_usd;
            status.avg_trade_fee = &status.fee_usd / BigDecimal::from(status.tx_count);
            status.avg_fee_bps = avg_fee_bps(&status.fee_usd, &status.volume_usd);
            status.revenue_usd = &status.revenue_usd + &revenue;
            status.pool_tokens_supply = supply.clone();
            statuses.push((granularity, status));
        }

        self.store.save_pool(&pool)?;
        for (granularity, status) in &statuses {
            self.store.put(granularity.pool_kind(), &status.id, status)?;
        }
        Ok(pool)
    }

    /// Folds one share-denominated deposit estimate into the pool and its
    /// buckets. `supply` is the post-deposit share supply.
    pub fn record_pool_deposit(
        &self,
        timestamp: i64,
        amount_usd: &BigDecimal,
        supply: &BigUint,
    ) -> IndexerResult<Pool> {
        let mut pool = self.store.load_pool()?;
        pool.deposit_count += 1;
        pool.deposited_usd = &pool.deposited_usd + amount_usd;
        pool.avg_deposit = &pool.deposited_usd / BigDecimal::from(pool.deposit_count);
        pool.pool_tokens_supply = supply.clone();

        let mut statuses = Vec::new();
        for granularity in Granularity::both() {
            let mut status = self.load_pool_status(&pool, timestamp, granularity)?;
            status.deposit_count += 1;
            status.deposited_usd = &status.deposited_usd + amount_usd;
            status.avg_deposit = &status.deposited_usd / BigDecimal::from(status.deposit_count);
            status.pool_tokens_supply = supply.clone();
            statuses.push((granularity, status));
        }

        self.store.save_pool(&pool)?;
        for (granularity, status) in &statuses {
            self.store.put(granularity.pool_kind(), &status.id, status)?;
        }
        Ok(pool)
    }

    /// Withdrawal counterpart of [`record_pool_deposit`]; `supply` is the
    /// post-burn share supply.
    pub fn record_pool_withdrawal(
        &self,
        timestamp: i64,
        amount_usd: &BigDecimal,
        supply: &BigUint,
    ) -> IndexerResult<Pool> {
        let mut pool = self.store.load_pool()?;
        pool.withdrawal_count += 1;
        pool.withdrew_usd = &pool.withdrew_usd + amount_usd;
        pool.avg_withdraw = &pool.withdrew_usd / BigDecimal::from(pool.withdrawal_count);
        pool.pool_tokens_supply = supply.clone();

        let mut statuses = Vec::new();
        for granularity in Granularity::both() {
            let mut status = self.load_pool_status(&pool, timestamp, granularity)?;
            status.withdrawal_count += 1;
            status.withdrew_usd = &status.withdrew_usd + amount_usd;
            status.avg_withdraw = &status.withdrew_usd / BigDecimal::from(status.withdrawal_count);
            status.pool_tokens_supply = supply.clone();
            statuses.push((granularity, status));
        }

        self.store.save_pool(&pool)?;
        for (granularity, status) in &statuses {
            self.store.put(granularity.pool_kind(), &status.id, status)?;
        }
        Ok(pool)
    }

    /// Folds one cove event into that cove's and the global hourly/daily
    /// buckets. `price` is the implied long-tail price observed by the
    /// handler; buckets always track the latest one.
    pub fn record_cove_activity(
        &self,
        cove_id: &str,
        timestamp: i64,
        activity: CoveActivity,
        volume_usd: &BigDecimal,
        price: &BigDecimal,
    ) -> IndexerResult<()> {
        for granularity in Granularity::both() {
            let mut status = self.load_cove_status(cove_id, timestamp, granularity)?;
            match activity {
                CoveActivity::Swap => {
                    status.tx_count += 1;
                    status.volume_usd = &status.volume_usd + volume_usd;
                    status.avg_trade = &status.volume_usd / BigDecimal::from(status.tx_count);
                }
                CoveActivity::Deposit => status.deposit_count += 1,
                CoveActivity::Withdrawal => status.withdrawal_count += 1,
            }
            status.price = price.clone();
            self.store.put(granularity.cove_kind(), &status.id, &status)?;

            let mut global = self.load_global_cove_status(timestamp, granularity)?;
            match activity {
                CoveActivity::Swap => {
                    global.tx_count += 1;
                    global.volume_usd = &global.volume_usd + volume_usd;
                    global.avg_trade = &global.volume_usd / BigDecimal::from(global.tx_count);
                }
                CoveActivity::Deposit => global.deposit_count += 1,
                CoveActivity::Withdrawal => global.withdrawal_count += 1,
            }
            global.price = price.clone();
            self.store
                .put(granularity.global_cove_kind(), &global.id, &global)?;
        }
        Ok(())
    }

    fn load_pool_status(
        &self,
        pool: &Pool,
        timestamp: i64,
        granularity: Granularity,
    ) -> IndexerResult<PoolStatus> {
        let interval = granularity.interval();
        let from = bucket_open_time(timestamp, interval);
        let to = from + interval - 1;
        let id = bucket_id(&pool.id, from, to);
        if let Some(status) = self.store.get(granularity.pool_kind(), &id)? {
            return Ok(status);
        }
        let status = PoolStatus {
            id: id.clone(),
            pool: pool.id.clone(),
            from,
            to,
            tx_count: 0,
            volume_usd: BigDecimal::zero(),
            avg_trade: BigDecimal::zero(),
            fee_usd: BigDecimal::zero(),
            avg_trade_fee: BigDecimal::zero(),
            avg_fee_bps: BigDecimal::zero(),
            revenue_usd: BigDecimal::zero(),
            deposit_count: 0,
            deposited_usd: BigDecimal::zero(),
            avg_deposit: BigDecimal::zero(),
            withdrawal_count: 0,
            withdrew_usd: BigDecimal::zero(),
            avg_withdraw: BigDecimal::zero(),
            pool_value: self.accountant.pool_liquidity_usd()?,
            pool_tokens_supply: BigUint::zero(),
        };
        self.store.put(granularity.pool_kind(), &id, &status)?;
        Ok(status)
    }

    fn load_cove_status(
        &self,
        cove_id: &str,
        timestamp: i64,
        granularity: Granularity,
    ) -> IndexerResult<CoveStatus> {
        let interval = granularity.interval();
        let from = bucket_open_time(timestamp, interval);
        let to = from + interval - 1;
        let id = bucket_id(cove_id, from, to);
        if let Some(status) = self.store.get(granularity.cove_kind(), &id)? {
            return Ok(status);
        }
        let status = CoveStatus {
            id: id.clone(),
            cove: cove_id.to_string(),
            from,
            to,
            tx_count: 0,
            volume_usd: BigDecimal::zero(),
            avg_trade: BigDecimal::zero(),
            deposit_count: 0,
            withdrawal_count: 0,
            price: BigDecimal::zero(),
        };
        self.store.put(granularity.cove_kind(), &id, &status)?;
        Ok(status)
    }

    fn load_global_cove_status(
        &self,
        timestamp: i64,
        granularity: Granularity,
    ) -> IndexerResult<GlobalCoveStatus> {
        let interval = granularity.interval();
        let from = bucket_open_time(timestamp, interval);
        let to = from + interval - 1;
        let id = bucket_id(GLOBAL_COVE_SCOPE, from, to);
        if let Some(status) = self.store.get(granularity.global_cove_kind(), &id)? {
            return Ok(status);
        }
        let status = GlobalCoveStatus {
            id: id.clone(),
            from,
            to,
            tx_count: 0,
            volume_usd: BigDecimal::zero(),
            avg_trade: BigDecimal::zero(),
            deposit_count: 0,
            withdrawal_count: 0,
            price: BigDecimal::zero(),
        };
        self.store
            .put(granularity.global_cove_kind(), &id, &status)?;
        Ok(status)
    }

    fn revenue_share(
        &self,
        timestamp: i64,
        fee_usd: &BigDecimal,
        supply: &BigUint,
    ) -> IndexerResult<BigDecimal> {
        let Some(fraction) = self.accountant.fee_split_fraction(supply)? else {
            return Ok(BigDecimal::zero());
        };
        let dao_share = self.config.dao_share_at(timestamp);
        Ok(fee_usd * fraction * dao_share)
    }
}

/// `fee / volume` in basis points; zero while no volume has been seen.
fn avg_fee_bps(fee_usd: &BigDecimal, volume_usd: &BigDecimal) -> BigDecimal {
    if volume_usd.is_zero() {
        return BigDecimal::zero();
    }
    fee_usd / volume_usd * BigDecimal::from(10_000u32)
}

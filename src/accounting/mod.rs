//! Proportional-ownership valuation of pooled liquidity.
//!
//! Everything here is mark-to-market: values derive from live balances and
//! resolved prices at the current event's chain snapshot, never from running
//! sums.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;

use crate::chain::ChainReader;
use crate::config::DeploymentConfig;
use crate::core::error::IndexerResult;
use crate::core::types::Address;
use crate::database::EntityStore;
use crate::math::{to_decimal, PackedBalances, POOL_TOKEN_DECIMALS};
use crate::pricing::PriceResolver;

/// Mark-to-market value of one cove, derived from its packed balances.
#[derive(Debug, Clone)]
pub struct CoveValuation {
    pub pool_tokens: BigDecimal,
    pub asset_balance: BigDecimal,
    /// USD value of the cove's pool-share leg.
    pub pool_leg_usd: BigDecimal,
    /// Reported cove TVL: twice the pool-share leg. The long-tail leg's own
    /// price is derived from that leg, so summing both would be circular.
    pub liquidity_usd: BigDecimal,
    /// Implied long-tail asset price; zero while the cove holds none.
    pub asset_price: BigDecimal,
}

#[derive(Clone)]
pub struct Accountant {
    store: EntityStore,
    chain: Arc<dyn ChainReader>,
    resolver: PriceResolver,
    config: Arc<DeploymentConfig>,
}

impl Accountant {
    pub fn new(
        store: EntityStore,
        chain: Arc<dyn ChainReader>,
        resolver: PriceResolver,
        config: Arc<DeploymentConfig>,
    ) -> Self {
        Self {
            store,
            chain,
            resolver,
            config,
        }
    }

    /// Sums `balance × price` over every asset the pool currently holds,
    /// refreshing each asset's mark-to-market fields along the way.
    pub fn pool_liquidity_usd(&self) -> IndexerResult<BigDecimal> {
        if let Some(value) = &self.config.pool_value_override {
            return Ok(value.clone());
        }

        let pool_address = &self.config.exchange;
        let n_tokens = self.chain.n_tokens(pool_address)?;
        let mut liquidity = BigDecimal::zero();
        for index in 0..n_tokens {
            let token_address = self.chain.token_at(pool_address, index)?;
            let mut asset = self.store.load_asset(&token_address)?;
            let raw_balance = self.chain.balance_of(&token_address, pool_address)?;
            let balance = to_decimal(&raw_balance, asset.decimals);
            let price = self.resolver.usd_price(&asset.symbol)?;
            let balance_usd = &balance * &price;
            liquidity = liquidity + &balance_usd;
            asset.tvl = balance;
            asset.tvl_usd = balance_usd;
            self.store.save_asset(&asset)?;
        }
        Ok(liquidity)
    }

    /// Live pool-share token supply.
    pub fn pool_token_supply(&self) -> IndexerResult<BigUint> {
        Ok(self.chain.total_supply(&self.config.exchange)?)
    }

    /// The post-operation supply carried by the event when non-zero, else
    /// the live chain figure (guards against event shapes that misreport
    /// the supply as zero).
    pub fn effective_share_supply(&self, reported: &BigUint) -> IndexerResult<BigUint> {
        if reported.is_zero() {
            self.pool_token_supply()
        } else {
            Ok(reported.clone())
        }
    }

    /// USD value of a claim of `share_tokens` on the pool, given the share
    /// supply after the operation being valued.
    pub fn pool_share_value_usd(
        &self,
        share_tokens: &BigUint,
        supply: &BigUint,
    ) -> IndexerResult<BigDecimal> {
        if supply.is_zero() {
            return Ok(BigDecimal::zero());
        }
        let liquidity = self.pool_liquidity_usd()?;
        let fraction =
            to_decimal(share_tokens, POOL_TOKEN_DECIMALS) / to_decimal(supply, POOL_TOKEN_DECIMALS);
        Ok(liquidity * fraction)
    }

    /// Values one cove from its packed on-chain balances.
    pub fn cove_valuation(
        &self,
        asset: &Address,
        asset_decimals: u32,
    ) -> IndexerResult<CoveValuation> {
        let packed = self
            .chain
            .cove_last_balances(&self.config.cove_controller, asset)?;
        let balances = PackedBalances::decode(&packed);
        let pool_tokens = balances.pool_tokens();
        let asset_balance = balances.asset_balance(asset_decimals);

        let supply = self.pool_token_supply()?;
        let pool_leg_usd = if supply.is_zero() {
            BigDecimal::zero()
        } else {
            let liquidity = self.pool_liquidity_usd()?;
            let fraction = &pool_tokens / to_decimal(&supply, POOL_TOKEN_DECIMALS);
            liquidity * fraction
        };
        let liquidity_usd = &pool_leg_usd * BigDecimal::from(2u32);
        let asset_price = if asset_balance.is_zero() {
            BigDecimal::zero()
        } else {
            &pool_leg_usd / &asset_balance
        };
        debug!(%asset, price = %asset_price, tvl = %liquidity_usd, "cove valuation");

        Ok(CoveValuation {
            pool_tokens,
            asset_balance,
            pool_leg_usd,
            liquidity_usd,
            asset_price,
        })
    }

    /// Fraction of the share supply held by the configured fee-split
    /// contract; `None` when no fee split is deployed.
    pub fn fee_split_fraction(&self, supply: &BigUint) -> IndexerResult<Option<BigDecimal>> {
        let Some(fee_split) = &self.config.fee_split else {
            return Ok(None);
        };
        if supply.is_zero() {
            return Ok(Some(BigDecimal::zero()));
        }
        let held = self.chain.balance_of(&self.config.exchange, fee_split)?;
        Ok(Some(
            to_decimal(&held, POOL_TOKEN_DECIMALS) / to_decimal(supply, POOL_TOKEN_DECIMALS),
        ))
    }
}

//! Handlers for cove (sub-vault) events.

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;

use super::{swap_fee_usd, HandlerDeps};
use crate::accounting::CoveValuation;
use crate::core::error::IndexerResult;
use crate::core::types::{Address, EventContext};
use crate::database::EntityKind;
use crate::feed::{CoveDepositedEvent, CoveSwappedEvent, CoveWithdrawnEvent};
use crate::math::{to_decimal, POOL_TOKEN_DECIMALS};
use crate::models::{Asset, AssetKind, Deposit, Swap, SwapKind, Withdrawal};
use crate::rollups::CoveActivity;

/// Price and mark-to-market balance for one swap leg.
struct LegValuation {
    price: BigDecimal,
    balance: BigDecimal,
    /// Present when the leg is long-tail; carries the cove refresh values.
    cove: Option<CoveValuation>,
}

pub struct CoveProcessor {
    deps: HandlerDeps,
}

impl CoveProcessor {
    pub(crate) fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    /// Cove deposit: proportional share estimate plus cove, asset and stake
    /// bookkeeping.
    pub fn handle_deposited(
        &self,
        ctx: &EventContext,
        event: &CoveDepositedEvent,
    ) -> IndexerResult<()> {
        let deps = &self.deps;
        let mut cove =
            deps.store
                .load_cove(&event.asset, &event.depositor, ctx.timestamp, &ctx.tx_hash)?;
        let mut cove_asset = deps.store.load_asset(&event.asset)?;
        let mut stake = deps.store.load_user_cove_stake(&cove.id, &event.depositor)?;

        let valuation = deps
            .accountant
            .cove_valuation(&event.asset, cove_asset.decimals)?;
        let estimated_usd =
            self.deposit_share_value(&event.asset, &event.pool_tokens, &event.deposit_supply, &valuation)?;

        cove.deposit_count += 1;
        cove.pool_token_amount = valuation.pool_tokens.clone();
        cove.longtail_token_amount = valuation.asset_balance.clone();
        cove.tvl_usd = valuation.liquidity_usd.clone();

        // the asset leg is worth exactly the pool-share leg by construction
        cove_asset.tvl = valuation.asset_balance.clone();
        cove_asset.tvl_usd = valuation.pool_leg_usd.clone();
        cove_asset.deposited_usd = &cove_asset.deposited_usd + &estimated_usd;

        stake.active = true;
        stake.deposit_tokens = &stake.deposit_tokens + &event.pool_tokens;

        let deposit = Deposit {
            id: ctx.tx_hash.clone(),
            timestamp: ctx.timestamp,
            transaction: ctx.tx_hash.clone(),
            pool: None,
            cove: Some(cove.id.clone()),
            token: None,
            amount: to_decimal(&event.pool_tokens, POOL_TOKEN_DECIMALS),
            amount_usd: estimated_usd.clone(),
            depositor: event.depositor.clone(),
        };

        deps.rollups.record_cove_activity(
            &cove.id,
            ctx.timestamp,
            CoveActivity::Deposit,
            &BigDecimal::zero(),
            &valuation.asset_price,
        )?;

        deps.store.put(EntityKind::Deposit, &deposit.id, &deposit)?;
        deps.store.save_cove(&cove)?;
        deps.store.save_user_cove_stake(&stake)?;
        deps.store.save_asset(&cove_asset)?;

        debug!(cove = %cove.id, usd = %estimated_usd, "cove deposit");
        Ok(())
    }

    /// Cove withdrawal: valuation refresh, stake decrement, deactivation at
    /// zero.
    pub fn handle_withdrawn(
        &self,
        ctx: &EventContext,
        event: &CoveWithdrawnEvent,
    ) -> IndexerResult<()> {
        let deps = &self.deps;
        let mut cove = deps.store.load_cove(
            &event.asset,
            &event.withdrawer,
            ctx.timestamp,
            &ctx.tx_hash,
        )?;
        let mut cove_asset = deps.store.load_asset(&event.asset)?;
        let mut stake = deps
            .store
            .load_user_cove_stake(&cove.id, &event.withdrawer)?;

        let valuation = deps
            .accountant
            .cove_valuation(&event.asset, cove_asset.decimals)?;
        let estimated_usd =
            self.deposit_share_value(&event.asset, &event.pool_tokens, &event.deposit_supply, &valuation)?;

        cove.withdrawal_count += 1;
        cove.pool_token_amount = valuation.pool_tokens.clone();
        cove.longtail_token_amount = valuation.asset_balance.clone();
        cove.tvl_usd = valuation.liquidity_usd.clone();

        cove_asset.tvl = valuation.asset_balance.clone();
        cove_asset.tvl_usd = &valuation.asset_balance * &valuation.asset_price;

        // net position; the flag flips once net deposited tokens reach zero
        if event.pool_tokens >= stake.deposit_tokens {
            stake.deposit_tokens = BigUint::zero();
            stake.active = false;
        } else {
            stake.deposit_tokens = &stake.deposit_tokens - &event.pool_tokens;
        }

        let withdrawal = Withdrawal {
            id: ctx.tx_hash.clone(),
            timestamp: ctx.timestamp,
            transaction: ctx.tx_hash.clone(),
            pool: None,
            cove: Some(cove.id.clone()),
            token: None,
            amount: to_decimal(&event.pool_tokens, POOL_TOKEN_DECIMALS),
            amount_usd: estimated_usd.clone(),
            withdrawer: event.withdrawer.clone(),
        };

        deps.rollups.record_cove_activity(
            &cove.id,
            ctx.timestamp,
            CoveActivity::Withdrawal,
            &BigDecimal::zero(),
            &valuation.asset_price,
        )?;

        deps.store
            .put(EntityKind::Withdrawal, &withdrawal.id, &withdrawal)?;
        deps.store.save_cove(&cove)?;
        deps.store.save_user_cove_stake(&stake)?;
        deps.store.save_asset(&cove_asset)?;

        debug!(cove = %cove.id, usd = %estimated_usd, "cove withdrawal");
        Ok(())
    }

    /// Cove swap: long-tail legs price via the cove's implied valuation,
    /// short-tail legs via the resolver. The pool rollup runs only when a
    /// short-tail leg is involved.
    pub fn handle_swapped(&self, ctx: &EventContext, event: &CoveSwappedEvent) -> IndexerResult<()> {
        let deps = &self.deps;
        let in_address = self.alias_native(&event.in_asset);
        let out_address = self.alias_native(&event.out_asset);

        let mut in_asset = deps.store.load_asset(&in_address)?;
        let mut out_asset = deps.store.load_asset(&out_address)?;

        let amount_in = to_decimal(&event.in_amount, in_asset.decimals);
        let amount_out = to_decimal(&event.out_amount, out_asset.decimals);

        let in_leg = self.value_leg(&in_address, &in_asset)?;
        let out_leg = self.value_leg(&out_address, &out_asset)?;

        let amount_in_usd = &in_leg.price * &amount_in;
        let amount_out_usd = &out_leg.price * &amount_out;
        let tx_volume = (&amount_in_usd + &amount_out_usd) / BigDecimal::from(2u32);
        let fee_usd = swap_fee_usd(&amount_in_usd, &amount_out_usd);

        in_asset.tx_count += 1;
        in_asset.volume = &in_asset.volume + &amount_in;
        in_asset.volume_usd = &in_asset.volume_usd + &amount_in_usd;
        in_asset.tvl_usd = &in_leg.balance * &in_leg.price;
        in_asset.tvl = in_leg.balance.clone();

        out_asset.tx_count += 1;
        out_asset.volume = &out_asset.volume + &amount_out;
        out_asset.volume_usd = &out_asset.volume_usd + &amount_out_usd;
        out_asset.tvl_usd = &out_leg.balance * &out_leg.price;
        out_asset.tvl = out_leg.balance.clone();

        let mut source = deps.store.load_transaction_source(&event.auxiliary_data)?;
        source.tx_count += 1;

        let mut pair = deps.store.load_pair(&in_asset.id, &out_asset.id)?;
        pair.tx_count += 1;
        pair.volume_usd = &pair.volume_usd + &tx_volume;

        let (_, is_new_user) = deps
            .store
            .upsert_user(&ctx.tx_from, ctx.timestamp, &tx_volume)?;

        let swap = Swap {
            id: format!("{}-{}", ctx.tx_hash, ctx.log_index),
            transaction: ctx.tx_hash.clone(),
            timestamp: ctx.timestamp,
            log_index: ctx.log_index,
            kind: SwapKind::Cove,
            pool: None,
            pair: Some(pair.id.clone()),
            transaction_source: source.id.clone(),
            in_token: in_asset.id.clone(),
            out_token: out_asset.id.clone(),
            sender: ctx.tx_from.clone(),
            recipient: event.recipient.clone(),
            origin: ctx.tx_from.clone(),
            amount_in,
            amount_out,
            amount_in_usd,
            amount_out_usd,
            price_per_input_token: in_leg.price.clone(),
            price_per_output_token: out_leg.price.clone(),
            fee_usd: fee_usd.clone(),
        };

        if !in_asset.kind.is_long_tail() || !out_asset.kind.is_long_tail() {
            deps.rollups
                .record_pool_swap(ctx.timestamp, &tx_volume, &fee_usd, is_new_user)?;
        }

        if let Some(valuation) = &in_leg.cove {
            self.touch_cove_after_swap(ctx, &in_address, event, valuation, &tx_volume, is_new_user)?;
        }
        if let Some(valuation) = &out_leg.cove {
            self.touch_cove_after_swap(
                ctx,
                &out_address,
                event,
                valuation,
                &tx_volume,
                is_new_user,
            )?;
        }

        deps.store.save_asset(&in_asset)?;
        deps.store.save_asset(&out_asset)?;
        deps.store
            .put(EntityKind::TransactionSource, &source.id, &source)?;
        deps.store.save_pair(&pair)?;
        deps.store.put(EntityKind::Swap, &swap.id, &swap)?;

        debug!(tx = %ctx.tx_hash, volume = %tx_volume, "cove swap");
        Ok(())
    }

    /// Zero-address legs are the native asset.
    fn alias_native(&self, address: &Address) -> Address {
        if address.is_zero() {
            self.deps.config.native_asset.clone()
        } else {
            address.clone()
        }
    }

    fn value_leg(&self, address: &Address, asset: &Asset) -> IndexerResult<LegValuation> {
        match &asset.kind {
            AssetKind::LongTail { .. } => {
                let valuation = self.deps.accountant.cove_valuation(address, asset.decimals)?;
                Ok(LegValuation {
                    price: valuation.asset_price.clone(),
                    balance: valuation.asset_balance.clone(),
                    cove: Some(valuation),
                })
            }
            AssetKind::ShortTail => {
                let price = self.deps.resolver.usd_price(&asset.symbol)?;
                let raw = self
                    .deps
                    .chain
                    .balance_of(address, &self.deps.config.exchange)?;
                Ok(LegValuation {
                    price,
                    balance: to_decimal(&raw, asset.decimals),
                    cove: None,
                })
            }
        }
    }

    fn touch_cove_after_swap(
        &self,
        ctx: &EventContext,
        asset_address: &Address,
        event: &CoveSwappedEvent,
        valuation: &CoveValuation,
        tx_volume: &BigDecimal,
        is_new_user: bool,
    ) -> IndexerResult<()> {
        let deps = &self.deps;
        let mut cove =
            deps.store
                .load_cove(asset_address, &event.recipient, ctx.timestamp, &ctx.tx_hash)?;
        cove.swap_count += 1;
        cove.pool_token_amount = valuation.pool_tokens.clone();
        cove.longtail_token_amount = valuation.asset_balance.clone();
        cove.volume_usd = &cove.volume_usd + tx_volume;
        cove.tvl_usd = valuation.liquidity_usd.clone();
        if is_new_user {
            cove.unique_users += 1;
        }
        deps.rollups.record_cove_activity(
            &cove.id,
            ctx.timestamp,
            CoveActivity::Swap,
            tx_volume,
            &valuation.asset_price,
        )?;
        deps.store.save_cove(&cove)?;
        Ok(())
    }

    /// Proportional value of deposited or withdrawn cove share tokens: the
    /// owned fraction of the cove's deposit-share supply, priced at the
    /// cove's current liquidity. Falls back to the live supply when the
    /// event reports zero.
    fn deposit_share_value(
        &self,
        asset: &Address,
        share_tokens: &BigUint,
        reported_supply: &BigUint,
        valuation: &CoveValuation,
    ) -> IndexerResult<BigDecimal> {
        let deps = &self.deps;
        let supply = if reported_supply.is_zero() {
            deps.chain
                .cove_deposit_supply(&deps.config.cove_controller, asset)?
        } else {
            reported_supply.clone()
        };
        if supply.is_zero() {
            return Ok(BigDecimal::zero());
        }
        let fraction =
            to_decimal(share_tokens, POOL_TOKEN_DECIMALS) / to_decimal(&supply, POOL_TOKEN_DECIMALS);
        Ok(&valuation.liquidity_usd * fraction)
    }
}

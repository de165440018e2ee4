//! Handlers for the exchange pool's own events.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use tracing::debug;

use super::{swap_fee_usd, HandlerDeps};
use crate::core::error::IndexerResult;
use crate::core::types::EventContext;
use crate::database::EntityKind;
use crate::feed::{DepositedEvent, SwappedEvent, TransferEvent, WithdrawnEvent};
use crate::math::{to_decimal, POOL_TOKEN_DECIMALS};
use crate::models::{Deposit, Swap, SwapKind, Withdrawal};

pub struct ExchangeProcessor {
    deps: HandlerDeps,
}

impl ExchangeProcessor {
    pub(crate) fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    /// Pool deposit: infer per-asset inflows from balance deltas, then fold
    /// the minted-share estimate into the pool and its buckets.
    pub fn handle_deposited(
        &self,
        ctx: &EventContext,
        event: &DepositedEvent,
    ) -> IndexerResult<()> {
        let deps = &self.deps;
        let pool_address = &deps.config.exchange;
        let pool_id = pool_address.to_string();

        // Per-asset inferred deposits: a positive delta of live balance over
        // the recorded tvl. Zero or negative deltas are unrelated refreshes.
        // All rows are computed before anything persists, so a reverting
        // price or balance call aborts the event without partial writes.
        let mut inferred = Vec::new();
        let n_tokens = deps.chain.n_tokens(pool_address)?;
        for index in 0..n_tokens {
            let token_address = deps.chain.token_at(pool_address, index)?;
            let mut asset = deps.store.load_asset(&token_address)?;
            let raw_balance = deps.chain.balance_of(&token_address, pool_address)?;
            let balance = to_decimal(&raw_balance, asset.decimals);
            let delta = &balance - &asset.tvl;
            if delta <= BigDecimal::zero() {
                continue;
            }

            let price = deps.resolver.usd_price(&asset.symbol)?;
            let delta_usd = &price * &delta;
            let deposit = Deposit {
                id: format!("{}-{}-{}", ctx.timestamp, ctx.tx_hash, asset.id),
                timestamp: ctx.timestamp,
                transaction: ctx.tx_hash.clone(),
                pool: Some(pool_id.clone()),
                cove: None,
                token: Some(asset.id.clone()),
                amount: delta.clone(),
                amount_usd: delta_usd.clone(),
                depositor: event.depositor.clone(),
            };

            asset.tvl = balance;
            asset.tvl_usd = &asset.tvl * &price;
            asset.deposited = &asset.deposited + &delta;
            asset.deposited_usd = &asset.deposited_usd + &delta_usd;
            inferred.push((deposit, asset));
        }
        for (deposit, asset) in &inferred {
            deps.store.put(EntityKind::Deposit, &deposit.id, deposit)?;
            deps.store.save_asset(asset)?;
        }

        // Share-denominated estimate of the whole deposit.
        let supply = deps
            .accountant
            .effective_share_supply(&event.pool_token_supply)?;
        let estimated_usd = deps
            .accountant
            .pool_share_value_usd(&event.pool_tokens, &supply)?;
        let deposit = Deposit {
            id: ctx.tx_hash.clone(),
            timestamp: ctx.timestamp,
            transaction: ctx.tx_hash.clone(),
            pool: Some(pool_id),
            cove: None,
            token: None,
            amount: to_decimal(&event.pool_tokens, POOL_TOKEN_DECIMALS),
            amount_usd: estimated_usd.clone(),
            depositor: event.depositor.clone(),
        };
        deps.store.put(EntityKind::Deposit, &deposit.id, &deposit)?;
        deps.rollups
            .record_pool_deposit(ctx.timestamp, &estimated_usd, &supply)?;

        debug!(tx = %ctx.tx_hash, usd = %estimated_usd, "pool deposit");
        Ok(())
    }

    /// Pool withdrawal, symmetric to [`handle_deposited`]: negative balance
    /// deltas become per-asset withdrawals, and the burned shares are valued
    /// against the post-burn supply.
    pub fn handle_withdrawn(
        &self,
        ctx: &EventContext,
        event: &WithdrawnEvent,
    ) -> IndexerResult<()> {
        let deps = &self.deps;
        let pool_address = &deps.config.exchange;
        let pool_id = pool_address.to_string();

        let mut inferred = Vec::new();
        let n_tokens = deps.chain.n_tokens(pool_address)?;
        for index in 0..n_tokens {
            let token_address = deps.chain.token_at(pool_address, index)?;
            let mut asset = deps.store.load_asset(&token_address)?;
            let raw_balance = deps.chain.balance_of(&token_address, pool_address)?;
            let balance = to_decimal(&raw_balance, asset.decimals);
            let delta = &asset.tvl - &balance;
            if delta <= BigDecimal::zero() {
                continue;
            }

            let price = deps.resolver.usd_price(&asset.symbol)?;
            let delta_usd = &price * &delta;
            let withdrawal = Withdrawal {
                id: format!("{}-{}-{}", ctx.timestamp, ctx.tx_hash, asset.id),
                timestamp: ctx.timestamp,
                transaction: ctx.tx_hash.clone(),
                pool: Some(pool_id.clone()),
                cove: None,
                token: Some(asset.id.clone()),
                amount: delta,
                amount_usd: delta_usd,
                withdrawer: event.withdrawer.clone(),
            };

            asset.tvl_usd = &balance * &price;
            asset.tvl = balance;
            inferred.push((withdrawal, asset));
        }
        for (withdrawal, asset) in &inferred {
            deps.store
                .put(EntityKind::Withdrawal, &withdrawal.id, withdrawal)?;
            deps.store.save_asset(asset)?;
        }

        let supply = deps
            .accountant
            .effective_share_supply(&event.pool_token_supply)?;
        let estimated_usd = deps
            .accountant
            .pool_share_value_usd(&event.pool_tokens, &supply)?;
        let withdrawal = Withdrawal {
            id: ctx.tx_hash.clone(),
            timestamp: ctx.timestamp,
            transaction: ctx.tx_hash.clone(),
            pool: Some(pool_id),
            cove: None,
            token: None,
            amount: to_decimal(&event.pool_tokens, POOL_TOKEN_DECIMALS),
            amount_usd: estimated_usd.clone(),
            withdrawer: event.withdrawer.clone(),
        };
        deps.store
            .put(EntityKind::Withdrawal, &withdrawal.id, &withdrawal)?;
        deps.rollups
            .record_pool_withdrawal(ctx.timestamp, &estimated_usd, &supply)?;

        debug!(tx = %ctx.tx_hash, usd = %estimated_usd, "pool withdrawal");
        Ok(())
    }

    /// Pool swap between two short-tail assets.
    pub fn handle_swapped(&self, ctx: &EventContext, event: &SwappedEvent) -> IndexerResult<()> {
        let deps = &self.deps;
        let pool_address = &deps.config.exchange;

        let mut in_asset = deps.store.load_asset(&event.in_asset)?;
        let mut out_asset = deps.store.load_asset(&event.out_asset)?;

        let amount_in = to_decimal(&event.in_amount, in_asset.decimals);
        let amount_out = to_decimal(&event.out_amount, out_asset.decimals);
        let input_price = deps.resolver.usd_price(&in_asset.symbol)?;
        let output_price = deps.resolver.usd_price(&out_asset.symbol)?;
        let amount_in_usd = &input_price * &amount_in;
        let amount_out_usd = &output_price * &amount_out;
        let tx_volume = (&amount_in_usd + &amount_out_usd) / BigDecimal::from(2u32);
        let fee_usd = swap_fee_usd(&amount_in_usd, &amount_out_usd);

        // Mark-to-market refresh of both legs, then lifetime counters.
        let in_balance = to_decimal(
            &deps.chain.balance_of(&event.in_asset, pool_address)?,
            in_asset.decimals,
        );
        let out_balance = to_decimal(
            &deps.chain.balance_of(&event.out_asset, pool_address)?,
            out_asset.decimals,
        );

        in_asset.tx_count += 1;
        in_asset.volume = &in_asset.volume + &amount_in;
        in_asset.volume_usd = &in_asset.volume_usd + &amount_in_usd;
        in_asset.tvl_usd = &in_balance * &input_price;
        in_asset.tvl = in_balance;

        out_asset.tx_count += 1;
        out_asset.volume = &out_asset.volume + &amount_out;
        out_asset.volume_usd = &out_asset.volume_usd + &amount_out_usd;
        out_asset.tvl_usd = &out_balance * &output_price;
        out_asset.tvl = out_balance;

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
            kind: SwapKind::Pool,
            pool: Some(pool_address.to_string()),
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
            price_per_input_token: input_price,
            price_per_output_token: output_price,
            fee_usd: fee_usd.clone(),
        };

        deps.rollups
            .record_pool_swap(ctx.timestamp, &tx_volume, &fee_usd, is_new_user)?;

        deps.store.save_asset(&in_asset)?;
        deps.store.save_asset(&out_asset)?;
        deps.store
            .put(EntityKind::TransactionSource, &source.id, &source)?;
        deps.store.save_pair(&pair)?;
        deps.store.put(EntityKind::Swap, &swap.id, &swap)?;

        debug!(tx = %ctx.tx_hash, volume = %tx_volume, "pool swap");
        Ok(())
    }

    /// Pool-share transfers matter only as attribution fix-ups: a deposit
    /// routed through the helper contract surfaces the true owner in a
    /// follow-up transfer, not in the deposit event itself.
    pub fn handle_transfer(&self, ctx: &EventContext, event: &TransferEvent) -> IndexerResult<()> {
        let deps = &self.deps;
        let Some(helper) = &deps.config.deposit_helper else {
            return Ok(());
        };
        if &event.from != helper {
            return Ok(());
        }
        let Some(mut deposit) = deps.store.get::<Deposit>(EntityKind::Deposit, &ctx.tx_hash)?
        else {
            return Ok(());
        };
        deposit.depositor = event.to.clone();
        deps.store.put(EntityKind::Deposit, &deposit.id, &deposit)?;
        debug!(tx = %ctx.tx_hash, owner = %deposit.depositor, "re-pointed helper deposit");
        Ok(())
    }
}

//! End-to-end handler tests against the mock chain and in-memory store.

mod common;

use anyhow::Result;
use num_traits::Zero;

use common::{
    addr, dec, envelope, fixture_chain, fixture_config, harness, units, Harness, EXCHANGE, HELPER,
    LONG_TAIL, TOKEN_X, TOKEN_Y, USER_1, USER_2,
};
use harbor_indexer::database::EntityKind;
use harbor_indexer::feed::{
    CoveDepositedEvent, CoveSwappedEvent, CoveWithdrawnEvent, DepositedEvent, ExchangeEvent,
    SwappedEvent, TransferEvent, WithdrawnEvent,
};
use harbor_indexer::math::{bucket_open_time, ONE_HOUR};
use harbor_indexer::models::{
    Asset, Cove, CoveStatus, Deposit, GlobalCoveStatus, Pair, Pool, PoolStatus, Swap, SwapKind,
    TransactionSource, User, UserCoveStake, Withdrawal,
};
use num_bigint::BigUint;

const TS: i64 = 1_690_848_123;

fn pool_id() -> String {
    addr(EXCHANGE).to_string()
}

fn hourly_bucket_id(scope: &str, timestamp: i64) -> String {
    let from = bucket_open_time(timestamp, ONE_HOUR);
    let to = from + ONE_HOUR - 1;
    format!("{scope}-{from}{to}")
}

fn swap(n: u64) -> ExchangeEvent {
    // n XTK ($2) in, 2n YTK ($1) out: both legs worth 2n USD, zero fee
    ExchangeEvent::Swapped(SwappedEvent {
        in_asset: addr(TOKEN_X),
        out_asset: addr(TOKEN_Y),
        in_amount: units(n),
        out_amount: units(2 * n),
        recipient: addr(USER_2),
        auxiliary_data: Vec::new(),
    })
}

#[test]
fn avg_trade_is_recomputed_from_sums_after_every_swap() -> Result<()> {
    let mut h = harness(fixture_chain(), fixture_config());

    for (i, n) in [1u64, 2, 3].iter().enumerate() {
        h.registry
            .process(&envelope(10 + i as u64, 0, TS, &format!("0xs{n}"), swap(*n)))?;
    }

    // volumes 2, 4, 6 -> sum 12, avg 4 after the third swap
    let pool: Pool = h.entities.get(EntityKind::Pool, &pool_id())?.unwrap();
    assert_eq!(pool.tx_count, 3);
    assert_eq!(pool.volume_usd, dec("12"));
    assert_eq!(pool.avg_trade, dec("4"));
    assert_eq!(pool.fee_usd, dec("0"));
    assert_eq!(pool.unique_users, 1);

    let hourly: PoolStatus = h
        .entities
        .get(
            EntityKind::HourlyPoolStatus,
            &hourly_bucket_id(&pool_id(), TS),
        )?
        .unwrap();
    assert_eq!(hourly.tx_count, 3);
    assert_eq!(hourly.volume_usd, dec("12"));
    assert_eq!(hourly.avg_trade, dec("4"));

    let x: Asset = h
        .entities
        .get(EntityKind::Asset, &addr(TOKEN_X).to_string())?
        .unwrap();
    assert_eq!(x.tx_count, 3);
    assert_eq!(x.volume, dec("6"));
    assert_eq!(x.volume_usd, dec("12"));

    let pair_id = format!("{}-{}", addr(TOKEN_X), addr(TOKEN_Y));
    let pair: Pair = h.entities.get(EntityKind::Pair, &pair_id)?.unwrap();
    assert_eq!(pair.tx_count, 3);
    assert_eq!(pair.volume_usd, dec("12"));

    let source: TransactionSource = h
        .entities
        .get(EntityKind::TransactionSource, "Harbor")?
        .unwrap();
    assert_eq!(source.tx_count, 3);

    let user: User = h
        .entities
        .get(EntityKind::User, &addr(USER_1).to_string())?
        .unwrap();
    assert_eq!(user.tx_count, 3);
    assert_eq!(user.volume_usd, dec("12"));

    Ok(())
}

#[test]
fn pair_lookup_is_unordered() -> Result<()> {
    let mut h = harness(fixture_chain(), fixture_config());

    h.registry.process(&envelope(10, 0, TS, "0xa", swap(1)))?;
    // reverse direction lands on the same pair document
    h.registry.process(&envelope(
        11,
        0,
        TS,
        "0xb",
        ExchangeEvent::Swapped(SwappedEvent {
            in_asset: addr(TOKEN_Y),
            out_asset: addr(TOKEN_X),
            in_amount: units(2),
            out_amount: units(1),
            recipient: addr(USER_2),
            auxiliary_data: Vec::new(),
        }),
    ))?;

    let pair_id = format!("{}-{}", addr(TOKEN_X), addr(TOKEN_Y));
    let pair: Pair = h.entities.get(EntityKind::Pair, &pair_id)?.unwrap();
    assert_eq!(pair.tx_count, 2);
    let reverse_id = format!("{}-{}", addr(TOKEN_Y), addr(TOKEN_X));
    assert!(h.entities.get::<Pair>(EntityKind::Pair, &reverse_id)?.is_none());
    Ok(())
}

#[test]
fn swap_fee_is_the_positive_leg_difference() -> Result<()> {
    let mut h = harness(fixture_chain(), fixture_config());

    // 10 XTK ($20) in, 19 YTK ($19) out -> $1 fee
    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xfee",
        ExchangeEvent::Swapped(SwappedEvent {
            in_asset: addr(TOKEN_X),
            out_asset: addr(TOKEN_Y),
            in_amount: units(10),
            out_amount: units(19),
            recipient: addr(USER_2),
            auxiliary_data: Vec::new(),
        }),
    ))?;

    let swap: Swap = h.entities.get(EntityKind::Swap, "0xfee-0")?.unwrap();
    assert_eq!(swap.fee_usd, dec("1"));
    assert_eq!(swap.kind, SwapKind::Pool);
    assert_eq!(swap.amount_in_usd, dec("20"));
    assert_eq!(swap.amount_out_usd, dec("19"));

    // out leg worth more than in leg: fee floors at zero
    h.registry.process(&envelope(
        11,
        0,
        TS,
        "0xneg",
        ExchangeEvent::Swapped(SwappedEvent {
            in_asset: addr(TOKEN_X),
            out_asset: addr(TOKEN_Y),
            in_amount: units(10),
            out_amount: units(21),
            recipient: addr(USER_2),
            auxiliary_data: Vec::new(),
        }),
    ))?;
    let swap: Swap = h.entities.get(EntityKind::Swap, "0xneg-0")?.unwrap();
    assert_eq!(swap.fee_usd, dec("0"));
    Ok(())
}

#[test]
fn deposit_share_estimate_matches_the_owned_fraction() -> Result<()> {
    let chain = fixture_chain();
    chain.set_pool_tokens(&addr(EXCHANGE), vec![addr(TOKEN_X), addr(TOKEN_Y)]);
    chain.set_balance(&addr(TOKEN_X), &addr(EXCHANGE), units(100));
    // YTK balance stays zero

    let mut h = harness(chain, fixture_config());

    // 10 shares minted against a post-deposit supply of 1000, pool worth
    // 100 * $2 + 0 * $1 = $200 -> estimate $2.00
    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xdep",
        ExchangeEvent::Deposited(DepositedEvent {
            depositor: addr(USER_2),
            pool_tokens: units(10),
            pool_token_supply: units(1000),
        }),
    ))?;

    let share_row: Deposit = h.entities.get(EntityKind::Deposit, "0xdep")?.unwrap();
    assert_eq!(share_row.amount_usd, dec("2.00"));
    assert_eq!(share_row.amount, dec("10"));
    assert!(share_row.token.is_none());
    assert_eq!(share_row.depositor, addr(USER_2));

    // the balance delta over a zero tvl is an inferred 100-token deposit
    let asset_row_id = format!("{}-0xdep-{}", TS, addr(TOKEN_X));
    let asset_row: Deposit = h.entities.get(EntityKind::Deposit, &asset_row_id)?.unwrap();
    assert_eq!(asset_row.amount, dec("100"));
    assert_eq!(asset_row.amount_usd, dec("200"));

    let x: Asset = h
        .entities
        .get(EntityKind::Asset, &addr(TOKEN_X).to_string())?
        .unwrap();
    assert_eq!(x.tvl, dec("100"));
    assert_eq!(x.tvl_usd, dec("200"));
    assert_eq!(x.deposited, dec("100"));
    assert_eq!(x.deposited_usd, dec("200"));

    let pool: Pool = h.entities.get(EntityKind::Pool, &pool_id())?.unwrap();
    assert_eq!(pool.deposit_count, 1);
    assert_eq!(pool.deposited_usd, dec("2.00"));
    assert_eq!(pool.avg_deposit, dec("2.00"));
    assert_eq!(pool.pool_tokens_supply, units(1000));

    let hourly: PoolStatus = h
        .entities
        .get(
            EntityKind::HourlyPoolStatus,
            &hourly_bucket_id(&pool_id(), TS),
        )?
        .unwrap();
    assert_eq!(hourly.deposit_count, 1);
    assert_eq!(hourly.deposited_usd, dec("2.00"));
    assert_eq!(hourly.pool_value, dec("200"));

    // replaying an unrelated balance refresh produces no new deposit: the
    // recorded tvl now equals the live balance
    h.registry.process(&envelope(
        11,
        0,
        TS + 10,
        "0xdep2",
        ExchangeEvent::Deposited(DepositedEvent {
            depositor: addr(USER_2),
            pool_tokens: BigUint::zero(),
            pool_token_supply: units(1000),
        }),
    ))?;
    let second_row_id = format!("{}-0xdep2-{}", TS + 10, addr(TOKEN_X));
    assert!(h
        .entities
        .get::<Deposit>(EntityKind::Deposit, &second_row_id)?
        .is_none());

    Ok(())
}

#[test]
fn withdrawal_estimate_uses_the_post_burn_supply() -> Result<()> {
    let mut config = fixture_config();
    // deployment workaround path: fixed pool value instead of live balances
    config.pool_value_override = Some(dec("500000"));

    let mut h = harness(fixture_chain(), config);

    // burn 10% of the post-withdrawal supply of a $500k pool -> $50,000
    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xwd",
        ExchangeEvent::Withdrawn(WithdrawnEvent {
            withdrawer: addr(USER_2),
            pool_tokens: units(100),
            pool_token_supply: units(1000),
        }),
    ))?;

    let row: Withdrawal = h.entities.get(EntityKind::Withdrawal, "0xwd")?.unwrap();
    assert_eq!(row.amount_usd, dec("50000"));

    let pool: Pool = h.entities.get(EntityKind::Pool, &pool_id())?.unwrap();
    assert_eq!(pool.withdrawal_count, 1);
    assert_eq!(pool.withdrew_usd, dec("50000"));
    assert_eq!(pool.avg_withdraw, dec("50000"));

    let hourly: PoolStatus = h
        .entities
        .get(
            EntityKind::HourlyPoolStatus,
            &hourly_bucket_id(&pool_id(), TS),
        )?
        .unwrap();
    assert_eq!(hourly.withdrawal_count, 1);
    assert_eq!(hourly.withdrew_usd, dec("50000"));

    Ok(())
}

#[test]
fn helper_routed_deposit_is_repointed_by_the_transfer() -> Result<()> {
    let mut config = fixture_config();
    config.deposit_helper = Some(addr(HELPER));
    config.pool_value_override = Some(dec("1000"));

    let mut h = harness(fixture_chain(), config);

    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xd1",
        ExchangeEvent::Deposited(DepositedEvent {
            depositor: addr(HELPER),
            pool_tokens: units(1),
            pool_token_supply: units(100),
        }),
    ))?;
    let row: Deposit = h.entities.get(EntityKind::Deposit, "0xd1")?.unwrap();
    assert_eq!(row.depositor, addr(HELPER));

    // the helper forwards the shares to the true owner in the same tx
    h.registry.process(&envelope(
        10,
        1,
        TS,
        "0xd1",
        ExchangeEvent::Transfer(TransferEvent {
            from: addr(HELPER),
            to: addr(USER_2),
            amount: units(1),
        }),
    ))?;
    let row: Deposit = h.entities.get(EntityKind::Deposit, "0xd1")?.unwrap();
    assert_eq!(row.depositor, addr(USER_2));

    // transfers from anyone else change nothing
    h.registry.process(&envelope(
        10,
        2,
        TS,
        "0xd1",
        ExchangeEvent::Transfer(TransferEvent {
            from: addr(USER_1),
            to: addr(HELPER),
            amount: units(1),
        }),
    ))?;
    let row: Deposit = h.entities.get(EntityKind::Deposit, "0xd1")?.unwrap();
    assert_eq!(row.depositor, addr(USER_2));

    Ok(())
}

#[test]
fn source_attribution_reads_the_auxiliary_data() -> Result<()> {
    let mut h = harness(fixture_chain(), fixture_config());

    let mut tagged = swap(1);
    if let ExchangeEvent::Swapped(event) = &mut tagged {
        event.auxiliary_data = b"router-x".to_vec();
    }
    h.registry.process(&envelope(10, 0, TS, "0xs1", tagged))?;
    h.registry.process(&envelope(11, 0, TS, "0xs2", swap(1)))?;

    let tagged_source: TransactionSource = h
        .entities
        .get(EntityKind::TransactionSource, "router-x")?
        .unwrap();
    assert_eq!(tagged_source.tx_count, 1);

    let default_source: TransactionSource = h
        .entities
        .get(EntityKind::TransactionSource, "Harbor")?
        .unwrap();
    assert_eq!(default_source.tx_count, 1);
    Ok(())
}

fn cove_fixture() -> Harness {
    let chain = fixture_chain();
    chain.set_pool_tokens(&addr(EXCHANGE), vec![addr(TOKEN_X)]);
    chain.set_balance(&addr(TOKEN_X), &addr(EXCHANGE), units(100));
    chain.set_supply(&addr(EXCHANGE), units(100));
    // cove holds 50 pool shares and 200 long-tail tokens:
    // leg = $200 * 50/100 = $100, tvl = $200, implied price = $0.50
    let packed = (units(50) << 128u32) | units(200);
    chain.set_cove_balances(&addr(LONG_TAIL), packed);
    harness(chain, fixture_config())
}

#[test]
fn cove_deposit_values_the_owned_fraction_of_cove_liquidity() -> Result<()> {
    let mut h = cove_fixture();

    // 10 of 40 deposit shares of a $200 cove -> $50
    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xcd",
        ExchangeEvent::CoveDeposited(CoveDepositedEvent {
            asset: addr(LONG_TAIL),
            depositor: addr(USER_1),
            pool_tokens: units(10),
            deposit_supply: units(40),
        }),
    ))?;

    let cove_id = addr(LONG_TAIL).to_string();
    let cove: Cove = h.entities.get(EntityKind::Cove, &cove_id)?.unwrap();
    assert_eq!(cove.deposit_count, 1);
    assert_eq!(cove.pool_token_amount, dec("50"));
    assert_eq!(cove.longtail_token_amount, dec("200"));
    assert_eq!(cove.tvl_usd, dec("200"));
    assert_eq!(cove.opener, addr(USER_1));

    let stake_id = format!("{}-{}", cove_id, addr(USER_1));
    let stake: UserCoveStake = h.entities.get(EntityKind::UserCoveStake, &stake_id)?.unwrap();
    assert!(stake.active);
    assert_eq!(stake.deposit_tokens, units(10));

    let row: Deposit = h.entities.get(EntityKind::Deposit, "0xcd")?.unwrap();
    assert_eq!(row.amount_usd, dec("50"));
    assert_eq!(row.cove.as_deref(), Some(cove_id.as_str()));

    let long: Asset = h.entities.get(EntityKind::Asset, &cove_id)?.unwrap();
    assert_eq!(long.tvl, dec("200"));
    assert_eq!(long.tvl_usd, dec("100"));
    assert_eq!(long.deposited_usd, dec("50"));

    let hourly: CoveStatus = h
        .entities
        .get(
            EntityKind::HourlyCoveStatus,
            &hourly_bucket_id(&cove_id, TS),
        )?
        .unwrap();
    assert_eq!(hourly.deposit_count, 1);
    assert_eq!(hourly.price, dec("0.5"));

    let global: GlobalCoveStatus = h
        .entities
        .get(
            EntityKind::HourlyGlobalCoveStatus,
            &hourly_bucket_id("global", TS),
        )?
        .unwrap();
    assert_eq!(global.deposit_count, 1);
    assert_eq!(global.price, dec("0.5"));

    Ok(())
}

#[test]
fn cove_swap_prices_the_long_tail_leg_by_implied_valuation() -> Result<()> {
    let mut h = cove_fixture();

    // 10 XTK ($20) in, 30 LNG ($15 at the implied $0.50) out
    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xcs",
        ExchangeEvent::CoveSwapped(CoveSwappedEvent {
            in_asset: addr(TOKEN_X),
            out_asset: addr(LONG_TAIL),
            in_amount: units(10),
            out_amount: units(30),
            recipient: addr(USER_2),
            auxiliary_data: Vec::new(),
        }),
    ))?;

    let swap: Swap = h.entities.get(EntityKind::Swap, "0xcs-0")?.unwrap();
    assert_eq!(swap.kind, SwapKind::Cove);
    assert_eq!(swap.amount_in_usd, dec("20"));
    assert_eq!(swap.amount_out_usd, dec("15"));
    assert_eq!(swap.price_per_output_token, dec("0.5"));
    assert_eq!(swap.fee_usd, dec("5"));

    let cove_id = addr(LONG_TAIL).to_string();
    let cove: Cove = h.entities.get(EntityKind::Cove, &cove_id)?.unwrap();
    assert_eq!(cove.swap_count, 1);
    assert_eq!(cove.volume_usd, dec("17.5"));
    assert_eq!(cove.tvl_usd, dec("200"));
    assert_eq!(cove.unique_users, 1);

    // one short-tail leg involved, so the pool rollup ran too
    let pool: Pool = h.entities.get(EntityKind::Pool, &pool_id())?.unwrap();
    assert_eq!(pool.tx_count, 1);
    assert_eq!(pool.volume_usd, dec("17.5"));
    assert_eq!(pool.fee_usd, dec("5"));

    let hourly: CoveStatus = h
        .entities
        .get(
            EntityKind::HourlyCoveStatus,
            &hourly_bucket_id(&cove_id, TS),
        )?
        .unwrap();
    assert_eq!(hourly.tx_count, 1);
    assert_eq!(hourly.volume_usd, dec("17.5"));
    assert_eq!(hourly.avg_trade, dec("17.5"));

    let long: Asset = h.entities.get(EntityKind::Asset, &cove_id)?.unwrap();
    assert_eq!(long.tx_count, 1);
    assert_eq!(long.volume, dec("30"));
    assert_eq!(long.volume_usd, dec("15"));

    Ok(())
}

#[test]
fn cove_stake_deactivates_once_net_tokens_reach_zero() -> Result<()> {
    let mut h = cove_fixture();
    let cove_id = addr(LONG_TAIL).to_string();

    h.registry.process(&envelope(
        10,
        0,
        TS,
        "0xcd",
        ExchangeEvent::CoveDeposited(CoveDepositedEvent {
            asset: addr(LONG_TAIL),
            depositor: addr(USER_1),
            pool_tokens: units(10),
            deposit_supply: units(40),
        }),
    ))?;
    h.registry.process(&envelope(
        11,
        0,
        TS + 60,
        "0xcw",
        ExchangeEvent::CoveWithdrawn(CoveWithdrawnEvent {
            asset: addr(LONG_TAIL),
            withdrawer: addr(USER_1),
            pool_tokens: units(10),
            deposit_supply: units(40),
        }),
    ))?;

    let stake_id = format!("{}-{}", cove_id, addr(USER_1));
    let stake: UserCoveStake = h.entities.get(EntityKind::UserCoveStake, &stake_id)?.unwrap();
    assert!(!stake.active);
    assert_eq!(stake.deposit_tokens, BigUint::zero());

    let cove: Cove = h.entities.get(EntityKind::Cove, &cove_id)?.unwrap();
    assert_eq!(cove.withdrawal_count, 1);

    let row: Withdrawal = h.entities.get(EntityKind::Withdrawal, "0xcw")?.unwrap();
    assert_eq!(row.amount_usd, dec("50"));
    assert_eq!(row.cove.as_deref(), Some(cove_id.as_str()));

    Ok(())
}

//! Load-or-create accessors for every aggregate kind.
//!
//! Each accessor persists a zeroed document synchronously before returning
//! it. Handlers routinely create an entity and then call into subroutines
//! that load the same entity by key, so a creation must be visible to any
//! later read within the same event, not just after the handler finishes.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{EntityKind, Store};
use crate::chain::ChainReader;
use crate::config::DeploymentConfig;
use crate::core::error::{IndexerResult, StorageError};
use crate::core::types::Address;
use crate::models::{
    Asset, Cove, Pair, Pool, TransactionSource, User, UserCoveStake,
};

/// Decimal precision assumed when a token's `decimals()` call reverts.
pub const DEFAULT_DECIMALS: u32 = 18;
const UNKNOWN_METADATA: &str = "unknown";
const UNKNOWN_SOURCE: &str = "Unknown";

#[derive(Clone)]
pub struct EntityStore {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainReader>,
    config: Arc<DeploymentConfig>,
}

impl EntityStore {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainReader>,
        config: Arc<DeploymentConfig>,
    ) -> Self {
        Self {
            store,
            chain,
            config,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, kind: EntityKind, key: &str) -> IndexerResult<Option<T>> {
        match self.store.get_raw(kind, key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes).map_err(|err| StorageError::Corrupt {
                    kind: kind.as_str(),
                    key: key.to_string(),
                    reason: err.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&self, kind: EntityKind, key: &str, value: &T) -> IndexerResult<()> {
        let bytes = bincode::serialize(value)?;
        self.store.put_raw(kind, key, &bytes)
    }

    // --- assets ---

    /// Loads an asset, creating it with zeroed counters and chain-probed
    /// metadata on first sight. Metadata probes are best-effort: a reverting
    /// `symbol`/`name`/`decimals` degrades to "unknown" / 18 rather than
    /// failing the event.
    pub fn load_asset(&self, address: &Address) -> IndexerResult<Asset> {
        let id = address.to_string();
        if let Some(asset) = self.get(EntityKind::Asset, &id)? {
            return Ok(asset);
        }

        let (symbol, name, decimals) = if address.is_zero() {
            (
                self.config.native_symbol.clone(),
                self.config.native_name.clone(),
                DEFAULT_DECIMALS,
            )
        } else {
            (
                self.chain
                    .token_symbol(address)
                    .unwrap_or_else(|_| UNKNOWN_METADATA.to_string()),
                self.chain
                    .token_name(address)
                    .unwrap_or_else(|_| UNKNOWN_METADATA.to_string()),
                self.chain.token_decimals(address).unwrap_or(DEFAULT_DECIMALS),
            )
        };
        let kind = self.config.classify(address);
        debug!(asset = %id, %symbol, decimals, "creating asset");

        let asset = Asset {
            id: id.clone(),
            symbol,
            name,
            decimals,
            kind,
            tx_count: 0,
            volume: BigDecimal::zero(),
            volume_usd: BigDecimal::zero(),
            tvl: BigDecimal::zero(),
            tvl_usd: BigDecimal::zero(),
            deposited: BigDecimal::zero(),
            deposited_usd: BigDecimal::zero(),
        };
        self.put(EntityKind::Asset, &id, &asset)?;
        Ok(asset)
    }

    pub fn save_asset(&self, asset: &Asset) -> IndexerResult<()> {
        self.put(EntityKind::Asset, &asset.id, asset)
    }

    // --- pool ---

    pub fn load_pool(&self) -> IndexerResult<Pool> {
        let id = self.config.exchange.to_string();
        if let Some(pool) = self.get(EntityKind::Pool, &id)? {
            return Ok(pool);
        }
        let pool = Pool {
            id: id.clone(),
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
            pool_tokens_supply: BigUint::zero(),
            unique_users: 0,
        };
        self.put(EntityKind::Pool, &id, &pool)?;
        Ok(pool)
    }

    pub fn save_pool(&self, pool: &Pool) -> IndexerResult<()> {
        self.put(EntityKind::Pool, &pool.id, pool)
    }

    // --- coves ---

    /// Cove creation also materializes its long-tail asset document, so the
    /// back-reference resolves immediately.
    pub fn load_cove(
        &self,
        asset: &Address,
        opener: &Address,
        timestamp: i64,
        tx_hash: &str,
    ) -> IndexerResult<Cove> {
        let id = asset.to_string();
        if let Some(cove) = self.get(EntityKind::Cove, &id)? {
            return Ok(cove);
        }
        self.load_asset(asset)?;
        debug!(cove = %id, "creating cove");
        let cove = Cove {
            id: id.clone(),
            asset: id.clone(),
            opener: opener.clone(),
            opened_at: timestamp,
            transaction: tx_hash.to_string(),
            pool_token_amount: BigDecimal::zero(),
            longtail_token_amount: BigDecimal::zero(),
            volume_usd: BigDecimal::zero(),
            tvl_usd: BigDecimal::zero(),
            swap_count: 0,
            deposit_count: 0,
            withdrawal_count: 0,
            unique_users: 0,
        };
        self.put(EntityKind::Cove, &id, &cove)?;
        Ok(cove)
    }

    pub fn save_cove(&self, cove: &Cove) -> IndexerResult<()> {
        self.put(EntityKind::Cove, &cove.id, cove)
    }

    pub fn load_user_cove_stake(
        &self,
        cove_id: &str,
        wallet: &Address,
    ) -> IndexerResult<UserCoveStake> {
        let id = format!("{cove_id}-{wallet}");
        if let Some(stake) = self.get(EntityKind::UserCoveStake, &id)? {
            return Ok(stake);
        }
        let stake = UserCoveStake {
            id: id.clone(),
            cove: cove_id.to_string(),
            user: wallet.clone(),
            deposit_tokens: BigUint::zero(),
            active: true,
        };
        self.put(EntityKind::UserCoveStake, &id, &stake)?;
        Ok(stake)
    }

    pub fn save_user_cove_stake(&self, stake: &UserCoveStake) -> IndexerResult<()> {
        self.put(EntityKind::UserCoveStake, &stake.id, stake)
    }

    // --- users ---

    /// Updates lifetime user stats. Returns `true` when the wallet was first
    /// seen; that flag is the unique-user signal the rollups consume, and it
    /// must fire exactly once per wallet.
    pub fn upsert_user(
        &self,
        wallet: &Address,
        timestamp: i64,
        volume_usd: &BigDecimal,
    ) -> IndexerResult<(User, bool)> {
        let id = wallet.to_string();
        let existing = self.get::<User>(EntityKind::User, &id)?;
        let is_new = existing.is_none();
        let mut user = existing.unwrap_or_else(|| User {
            id: id.clone(),
            first_tx_timestamp: timestamp,
            last_tx_timestamp: timestamp,
            volume_usd: BigDecimal::zero(),
            tx_count: 0,
        });
        user.last_tx_timestamp = timestamp;
        user.volume_usd = &user.volume_usd + volume_usd;
        user.tx_count += 1;
        self.put(EntityKind::User, &id, &user)?;
        Ok((user, is_new))
    }

    // --- pairs ---

    /// Loads the unordered pair document, trying both orderings before
    /// creating one under the `(asset0, asset1)` spelling.
    pub fn load_pair(&self, asset0: &str, asset1: &str) -> IndexerResult<Pair> {
        let id = Pair::key(asset0, asset1);
        if let Some(pair) = self.get(EntityKind::Pair, &id)? {
            return Ok(pair);
        }
        let alt = Pair::key(asset1, asset0);
        if let Some(pair) = self.get(EntityKind::Pair, &alt)? {
            return Ok(pair);
        }
        let pair = Pair {
            id: id.clone(),
            asset0: asset0.to_string(),
            asset1: asset1.to_string(),
            tx_count: 0,
            volume_usd: BigDecimal::zero(),
        };
        self.put(EntityKind::Pair, &id, &pair)?;
        Ok(pair)
    }

    pub fn save_pair(&self, pair: &Pair) -> IndexerResult<()> {
        self.put(EntityKind::Pair, &pair.id, pair)
    }

    // --- transaction sources ---

    /// Resolves the attribution tag carried in a swap's auxiliary data. A
    /// numerically-zero or empty blob attributes to the configured default
    /// source; an unparseable blob maps to the "Unknown" sentinel instead of
    /// failing the event.
    pub fn load_transaction_source(
        &self,
        auxiliary_data: &[u8],
    ) -> IndexerResult<TransactionSource> {
        let id = source_tag(auxiliary_data, &self.config.default_source);
        if let Some(source) = self.get(EntityKind::TransactionSource, &id)? {
            return Ok(source);
        }
        let source = TransactionSource {
            id: id.clone(),
            tx_count: 0,
        };
        self.put(EntityKind::TransactionSource, &id, &source)?;
        Ok(source)
    }
}

fn source_tag(auxiliary_data: &[u8], default_source: &str) -> String {
    if auxiliary_data.iter().all(|b| *b == 0) {
        return default_source.to_string();
    }
    match std::str::from_utf8(auxiliary_data) {
        Ok(s) => {
            let trimmed = s.trim_matches(char::from(0)).trim();
            if trimmed.is_empty() {
                default_source.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(_) => UNKNOWN_SOURCE.to_string(),
    }
}

//! Shared test harness: a configurable mock chain, a deployment fixture and
//! a registry wired to the in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};

use harbor_indexer::chain::{ChainReader, ChainResult};
use harbor_indexer::config::DeploymentConfig;
use harbor_indexer::core::error::ChainError;
use harbor_indexer::core::types::{Address, EventContext};
use harbor_indexer::database::{EntityStore, MemoryStore};
use harbor_indexer::feed::{EventEnvelope, ExchangeEvent};
use harbor_indexer::processors::EventRegistry;

/// Address with every byte zero except the last.
pub fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Address::from_slice(&bytes).unwrap()
}

/// `n` whole tokens at 18 decimals, as a raw amount.
pub fn units(n: u64) -> BigUint {
    BigUint::from(n) * num_traits::pow(BigUint::from(10u64), 18)
}

pub fn dec(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

#[derive(Default)]
struct MockState {
    symbols: HashMap<Address, String>,
    names: HashMap<Address, String>,
    decimals: HashMap<Address, u32>,
    balances: HashMap<(Address, Address), BigUint>,
    supplies: HashMap<Address, BigUint>,
    pool_tokens: HashMap<Address, Vec<Address>>,
    oracle_answers: HashMap<Address, (BigInt, u32)>,
    reverting_oracles: Vec<Address>,
    cove_balances: HashMap<Address, BigUint>,
    cove_deposit_supplies: HashMap<Address, BigUint>,
}

/// In-memory chain snapshot. Unset balances and supplies read as zero, the
/// way an untouched ERC20 slot would.
#[derive(Default)]
pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: &Address, symbol: &str, name: &str, decimals: u32) {
        let mut state = self.state.lock().unwrap();
        state.symbols.insert(token.clone(), symbol.to_string());
        state.names.insert(token.clone(), name.to_string());
        state.decimals.insert(token.clone(), decimals);
    }

    pub fn set_balance(&self, token: &Address, owner: &Address, raw: BigUint) {
        let mut state = self.state.lock().unwrap();
        state.balances.insert((token.clone(), owner.clone()), raw);
    }

    pub fn set_supply(&self, token: &Address, raw: BigUint) {
        let mut state = self.state.lock().unwrap();
        state.supplies.insert(token.clone(), raw);
    }

    pub fn set_pool_tokens(&self, pool: &Address, tokens: Vec<Address>) {
        let mut state = self.state.lock().unwrap();
        state.pool_tokens.insert(pool.clone(), tokens);
    }

    pub fn set_oracle(&self, oracle: &Address, answer: i64, decimals: u32) {
        let mut state = self.state.lock().unwrap();
        state
            .oracle_answers
            .insert(oracle.clone(), (BigInt::from(answer), decimals));
    }

    pub fn set_oracle_reverting(&self, oracle: &Address) {
        let mut state = self.state.lock().unwrap();
        state.reverting_oracles.push(oracle.clone());
    }

    pub fn set_cove_balances(&self, asset: &Address, packed: BigUint) {
        let mut state = self.state.lock().unwrap();
        state.cove_balances.insert(asset.clone(), packed);
    }

    pub fn set_cove_deposit_supply(&self, asset: &Address, supply: BigUint) {
        let mut state = self.state.lock().unwrap();
        state.cove_deposit_supplies.insert(asset.clone(), supply);
    }
}

fn reverted(contract: &Address, call: &'static str) -> ChainError {
    ChainError::Reverted {
        contract: contract.to_string(),
        call,
    }
}

impl ChainReader for MockChain {
    fn token_symbol(&self, token: &Address) -> ChainResult<String> {
        let state = self.state.lock().unwrap();
        state
            .symbols
            .get(token)
            .cloned()
            .ok_or_else(|| reverted(token, "symbol"))
    }

    fn token_name(&self, token: &Address) -> ChainResult<String> {
        let state = self.state.lock().unwrap();
        state
            .names
            .get(token)
            .cloned()
            .ok_or_else(|| reverted(token, "name"))
    }

    fn token_decimals(&self, token: &Address) -> ChainResult<u32> {
        let state = self.state.lock().unwrap();
        state
            .decimals
            .get(token)
            .copied()
            .ok_or_else(|| reverted(token, "decimals"))
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> ChainResult<BigUint> {
        let state = self.state.lock().unwrap();
        Ok(state
            .balances
            .get(&(token.clone(), owner.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn total_supply(&self, token: &Address) -> ChainResult<BigUint> {
        let state = self.state.lock().unwrap();
        Ok(state.supplies.get(token).cloned().unwrap_or_default())
    }

    fn n_tokens(&self, pool: &Address) -> ChainResult<u32> {
        let state = self.state.lock().unwrap();
        Ok(state.pool_tokens.get(pool).map_or(0, |tokens| tokens.len() as u32))
    }

    fn token_at(&self, pool: &Address, index: u32) -> ChainResult<Address> {
        let state = self.state.lock().unwrap();
        state
            .pool_tokens
            .get(pool)
            .and_then(|tokens| tokens.get(index as usize))
            .cloned()
            .ok_or_else(|| reverted(pool, "tokenAt"))
    }

    fn oracle_latest_answer(&self, oracle: &Address) -> ChainResult<BigInt> {
        let state = self.state.lock().unwrap();
        if state.reverting_oracles.contains(oracle) {
            return Err(reverted(oracle, "latestRoundData"));
        }
        state
            .oracle_answers
            .get(oracle)
            .map(|(answer, _)| answer.clone())
            .ok_or_else(|| reverted(oracle, "latestRoundData"))
    }

    fn oracle_decimals(&self, oracle: &Address) -> ChainResult<u32> {
        let state = self.state.lock().unwrap();
        if state.reverting_oracles.contains(oracle) {
            return Err(reverted(oracle, "decimals"));
        }
        state
            .oracle_answers
            .get(oracle)
            .map(|(_, decimals)| *decimals)
            .ok_or_else(|| reverted(oracle, "decimals"))
    }

    fn cove_last_balances(&self, _controller: &Address, asset: &Address) -> ChainResult<BigUint> {
        let state = self.state.lock().unwrap();
        Ok(state.cove_balances.get(asset).cloned().unwrap_or_default())
    }

    fn cove_deposit_supply(&self, _controller: &Address, asset: &Address) -> ChainResult<BigUint> {
        let state = self.state.lock().unwrap();
        Ok(state
            .cove_deposit_supplies
            .get(asset)
            .cloned()
            .unwrap_or_default())
    }
}

// canonical fixture addresses
pub const EXCHANGE: u8 = 0xE1;
pub const COVE_CONTROLLER: u8 = 0xC0;
pub const TOKEN_X: u8 = 0xA1;
pub const TOKEN_Y: u8 = 0xA2;
pub const LONG_TAIL: u8 = 0xB1;
pub const HELPER: u8 = 0xD0;
pub const USER_1: u8 = 0x51;
pub const USER_2: u8 = 0x52;

/// Deployment with two fallback-priced short-tail tokens (XTK at $2, YTK at
/// $1) and everything else long-tail.
pub fn fixture_config() -> DeploymentConfig {
    let mut config = DeploymentConfig {
        exchange: addr(EXCHANGE),
        cove_controller: addr(COVE_CONTROLLER),
        short_tail_assets: vec![addr(TOKEN_X), addr(TOKEN_Y)],
        ..DeploymentConfig::default()
    };
    config.fallback_prices.insert("XTK".to_string(), dec("2"));
    config.fallback_prices.insert("YTK".to_string(), dec("1"));
    config
}

/// Mock chain pre-loaded with the fixture tokens.
pub fn fixture_chain() -> MockChain {
    let chain = MockChain::new();
    chain.set_token(&addr(TOKEN_X), "XTK", "Token X", 18);
    chain.set_token(&addr(TOKEN_Y), "YTK", "Token Y", 18);
    chain.set_token(&addr(LONG_TAIL), "LNG", "Long Tail", 18);
    chain
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub entities: EntityStore,
    pub registry: EventRegistry,
    pub chain: Arc<MockChain>,
    pub config: Arc<DeploymentConfig>,
}

pub fn harness(chain: MockChain, config: DeploymentConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let chain = Arc::new(chain);
    let config = Arc::new(config);
    let entities = EntityStore::new(store.clone(), chain.clone(), config.clone());
    let registry = EventRegistry::new(entities.clone(), chain.clone(), config.clone());
    Harness {
        store,
        entities,
        registry,
        chain,
        config,
    }
}

/// Envelope with sequential positions; `tx_from` defaults to USER_1.
pub fn envelope(block: u64, log_index: u64, timestamp: i64, tx_hash: &str, event: ExchangeEvent) -> EventEnvelope {
    EventEnvelope {
        context: EventContext {
            contract: addr(EXCHANGE),
            block_number: block,
            timestamp,
            tx_hash: tx_hash.to_string(),
            log_index,
            tx_from: addr(USER_1),
        },
        event,
    }
}

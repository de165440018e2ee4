//! Read-only chain-state collaborator.
//!
//! All calls are point-in-time reads against the chain snapshot the current
//! event was finalized in; handlers suspend only here. Metadata calls
//! (`symbol`/`name`/`decimals`) are individually revert-tolerant at their
//! call sites; balance and supply calls are required.

pub mod rpc;

pub use rpc::EthRpcClient;

use num_bigint::{BigInt, BigUint};

use crate::core::error::ChainError;
use crate::core::types::Address;

pub type ChainResult<T> = Result<T, ChainError>;

pub trait ChainReader: Send + Sync {
    // ERC20 views
    fn token_symbol(&self, token: &Address) -> ChainResult<String>;
    fn token_name(&self, token: &Address) -> ChainResult<String>;
    fn token_decimals(&self, token: &Address) -> ChainResult<u32>;
    fn balance_of(&self, token: &Address, owner: &Address) -> ChainResult<BigUint>;
    fn total_supply(&self, token: &Address) -> ChainResult<BigUint>;

    // exchange pool views
    fn n_tokens(&self, pool: &Address) -> ChainResult<u32>;
    fn token_at(&self, pool: &Address, index: u32) -> ChainResult<Address>;

    // oracle views
    fn oracle_latest_answer(&self, oracle: &Address) -> ChainResult<BigInt>;
    fn oracle_decimals(&self, oracle: &Address) -> ChainResult<u32>;

    // cove controller views
    fn cove_last_balances(&self, controller: &Address, asset: &Address) -> ChainResult<BigUint>;
    fn cove_deposit_supply(&self, controller: &Address, asset: &Address) -> ChainResult<BigUint>;
}

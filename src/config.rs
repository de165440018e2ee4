//! Configuration: runtime knobs plus the per-deployment address tables.
//!
//! The oracle table, fallback-price table and short-tail classification are
//! deployment data injected here, never module-level state, so tests and
//! multi-network deployments can construct their own.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::core::error::{IndexerError, IndexerResult};
use crate::core::types::Address;
use crate::models::AssetKind;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexerConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8545".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub rocksdb: RocksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksConfig {
    pub path: PathBuf,
    pub enable_compression: bool,
    pub max_open_files: i32,
    pub write_buffer_size_mb: usize,
    pub max_write_buffer_number: i32,
}

impl Default for RocksConfig {
    fn default() -> Self {
        Self {
            path: "./data/rocksdb".into(),
            enable_compression: true,
            max_open_files: 1000,
            write_buffer_size_mb: 256,
            max_write_buffer_number: 4,
        }
    }
}

/// Per-network contract addresses and pricing tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Exchange pool contract. Its address is the Pool entity id and doubles
    /// as the pool-share token address.
    pub exchange: Address,
    /// Cove controller holding the packed balances of every cove.
    pub cove_controller: Address,
    /// Helper contract whose routed deposits need attribution fix-ups.
    pub deposit_helper: Option<Address>,
    /// Fee-split holder used for revenue attribution.
    pub fee_split: Option<Address>,
    /// Timestamp after which the DAO keeps the full revenue share
    /// (half before).
    pub dao_revenue_cutover: Option<i64>,
    /// Deployment workaround: a fixed pool value standing in for live
    /// balances. Leave unset everywhere the pool can be valued normally.
    pub pool_value_override: Option<BigDecimal>,
    pub start_block: u64,

    /// Asset substituted for the zero address in cove swaps.
    pub native_asset: Address,
    pub native_symbol: String,
    pub native_name: String,

    /// Assets listed directly in the pool. Everything else is long-tail.
    pub short_tail_assets: Vec<Address>,
    /// symbol -> oracle address; the zero address disables an entry.
    pub oracles: BTreeMap<String, Address>,
    /// symbol -> static USD price used when no usable oracle exists.
    pub fallback_prices: BTreeMap<String, BigDecimal>,
    /// Attribution tag used when a swap carries no auxiliary data.
    pub default_source: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            exchange: Address::ZERO,
            cove_controller: Address::ZERO,
            deposit_helper: None,
            fee_split: None,
            dao_revenue_cutover: None,
            pool_value_override: None,
            start_block: 0,
            native_asset: Address::ZERO,
            native_symbol: "ETH".to_string(),
            native_name: "Ether".to_string(),
            short_tail_assets: Vec::new(),
            oracles: BTreeMap::new(),
            fallback_prices: BTreeMap::new(),
            default_source: "Harbor".to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Short-tail assets trade directly against the pool; every other asset
    /// lives in the cove keyed by its own address.
    pub fn classify(&self, asset: &Address) -> AssetKind {
        if self.short_tail_assets.contains(asset) {
            AssetKind::ShortTail
        } else {
            AssetKind::LongTail {
                cove: asset.to_string(),
            }
        }
    }

    /// DAO revenue share in force at `timestamp`.
    pub fn dao_share_at(&self, timestamp: i64) -> BigDecimal {
        match self.dao_revenue_cutover {
            Some(cutover) if timestamp < cutover => BigDecimal::new(BigInt::from(5), 1),
            _ => BigDecimal::one(),
        }
    }
}

impl IndexerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> IndexerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            IndexerError::Configuration(format!("failed to read {}: {err}", path.display()))
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|err| IndexerError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> IndexerResult<()> {
        if self.rpc.endpoint.is_empty() {
            return Err(IndexerError::Configuration(
                "rpc.endpoint cannot be empty".to_string(),
            ));
        }
        if self.deployment.exchange.is_zero() {
            return Err(IndexerError::Configuration(
                "deployment.exchange must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_directories(&self) -> IndexerResult<()> {
        std::fs::create_dir_all(&self.storage.rocksdb.path)
            .map_err(|err| IndexerError::Configuration(err.to_string()))
    }
}

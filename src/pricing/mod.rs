//! Three-tier USD price resolution.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_traits::One;
use tracing::warn;

use crate::chain::ChainReader;
use crate::config::DeploymentConfig;
use crate::core::error::{ChainError, IndexerResult};
use crate::core::types::Address;
use crate::math::signed_to_decimal;

#[derive(Clone)]
pub struct PriceResolver {
    chain: Arc<dyn ChainReader>,
    config: Arc<DeploymentConfig>,
}

impl PriceResolver {
    pub fn new(chain: Arc<dyn ChainReader>, config: Arc<DeploymentConfig>) -> Self {
        Self { chain, config }
    }

    /// Resolves a USD price for `symbol`.
    ///
    /// Precedence: a configured non-zero oracle, then the static fallback
    /// table, then 1 (stable and native sentinel symbols carry no pricing
    /// need). A reverting oracle is fatal for the current event unless a
    /// fallback exists for the same symbol, in which case the fallback is
    /// used as the degraded-mode safety net.
    pub fn usd_price(&self, symbol: &str) -> IndexerResult<BigDecimal> {
        let oracle = self
            .config
            .oracles
            .get(symbol)
            .filter(|address| !address.is_zero());
        let fallback = self.config.fallback_prices.get(symbol);

        if let Some(oracle) = oracle {
            match self.oracle_price(oracle) {
                Ok(price) => return Ok(price),
                Err(err) if err.is_revert() => {
                    if let Some(price) = fallback {
                        warn!(%symbol, %oracle, "oracle reverted, using fallback price");
                        return Ok(price.clone());
                    }
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(price) = fallback {
            return Ok(price.clone());
        }

        Ok(BigDecimal::one())
    }

    fn oracle_price(&self, oracle: &Address) -> Result<BigDecimal, ChainError> {
        let answer = self.chain.oracle_latest_answer(oracle)?;
        let decimals = self.chain.oracle_decimals(oracle)?;
        Ok(signed_to_decimal(&answer, decimals))
    }
}

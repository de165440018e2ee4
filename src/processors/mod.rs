//! Event handlers: one state-transition function per event kind.
//!
//! Handlers read the current aggregate state, compute every delta through
//! the accountant/resolver/rollups, and persist a consistent new state
//! before returning. A required chain call that reverts aborts the event;
//! nothing is retried here.

mod cove;
mod exchange;

pub use cove::CoveProcessor;
pub use exchange::ExchangeProcessor;

use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use tracing::warn;

use crate::accounting::Accountant;
use crate::chain::ChainReader;
use crate::config::DeploymentConfig;
use crate::core::error::IndexerResult;
use crate::database::EntityStore;
use crate::feed::{EventEnvelope, ExchangeEvent};
use crate::pricing::PriceResolver;
use crate::rollups::Rollups;

/// Shared collaborators handed to every handler.
#[derive(Clone)]
pub(crate) struct HandlerDeps {
    pub store: EntityStore,
    pub chain: Arc<dyn ChainReader>,
    pub resolver: PriceResolver,
    pub accountant: Accountant,
    pub rollups: Rollups,
    pub config: Arc<DeploymentConfig>,
}

/// Routes decoded events to their handlers in stream order.
pub struct EventRegistry {
    exchange: ExchangeProcessor,
    cove: CoveProcessor,
    last_position: Option<(u64, u64)>,
}

impl EventRegistry {
    pub fn new(
        store: EntityStore,
        chain: Arc<dyn ChainReader>,
        config: Arc<DeploymentConfig>,
    ) -> Self {
        let resolver = PriceResolver::new(chain.clone(), config.clone());
        let accountant = Accountant::new(
            store.clone(),
            chain.clone(),
            resolver.clone(),
            config.clone(),
        );
        let rollups = Rollups::new(store.clone(), accountant.clone(), config.clone());
        let deps = HandlerDeps {
            store,
            chain,
            resolver,
            accountant,
            rollups,
            config,
        };
        Self {
            exchange: ExchangeProcessor::new(deps.clone()),
            cove: CoveProcessor::new(deps),
            last_position: None,
        }
    }

    /// Applies one event. The upstream feed guarantees canonical order and
    /// dedup; a position regression is logged, never reordered.
    pub fn process(&mut self, envelope: &EventEnvelope) -> IndexerResult<()> {
        let position = envelope.context.position();
        if let Some(last) = self.last_position {
            if position < last {
                warn!(?position, ?last, "event feed position regressed");
            }
        }
        self.last_position = Some(position);

        let ctx = &envelope.context;
        match &envelope.event {
            ExchangeEvent::Deposited(event) => self.exchange.handle_deposited(ctx, event),
            ExchangeEvent::Withdrawn(event) => self.exchange.handle_withdrawn(ctx, event),
            ExchangeEvent::Swapped(event) => self.exchange.handle_swapped(ctx, event),
            ExchangeEvent::Transfer(event) => self.exchange.handle_transfer(ctx, event),
            ExchangeEvent::CoveDeposited(event) => self.cove.handle_deposited(ctx, event),
            ExchangeEvent::CoveWithdrawn(event) => self.cove.handle_withdrawn(ctx, event),
            ExchangeEvent::CoveSwapped(event) => self.cove.handle_swapped(ctx, event),
        }
    }
}

/// Fee observed on a swap: the USD value lost between legs, floored at zero.
pub(crate) fn swap_fee_usd(amount_in_usd: &BigDecimal, amount_out_usd: &BigDecimal) -> BigDecimal {
    let fee = amount_in_usd - amount_out_usd;
    if fee < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        fee
    }
}

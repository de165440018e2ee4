//! Inbound decoded-event feed.
//!
//! Envelopes arrive as NDJSON, deduplicated and in canonical order (block
//! height, then log index) per the upstream contract. Amounts travel as
//! decimal strings, auxiliary data as hex.

use std::io::BufRead;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::core::error::{IndexerError, IndexerResult};
use crate::core::serde_util::{display_string, hex_bytes};
use crate::core::types::{Address, EventContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub context: EventContext,
    pub event: ExchangeEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeEvent {
    Deposited(DepositedEvent),
    Withdrawn(WithdrawnEvent),
    Swapped(SwappedEvent),
    Transfer(TransferEvent),
    CoveDeposited(CoveDepositedEvent),
    CoveWithdrawn(CoveWithdrawnEvent),
    CoveSwapped(CoveSwappedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositedEvent {
    pub depositor: Address,
    /// Minted pool-share tokens.
    #[serde(with = "display_string")]
    pub pool_tokens: BigUint,
    /// Share supply after the mint; zero means "not reported".
    #[serde(with = "display_string")]
    pub pool_token_supply: BigUint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawnEvent {
    pub withdrawer: Address,
    /// Burned pool-share tokens.
    #[serde(with = "display_string")]
    pub pool_tokens: BigUint,
    /// Share supply after the burn; zero means "not reported".
    #[serde(with = "display_string")]
    pub pool_token_supply: BigUint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwappedEvent {
    pub in_asset: Address,
    pub out_asset: Address,
    #[serde(with = "display_string")]
    pub in_amount: BigUint,
    #[serde(with = "display_string")]
    pub out_amount: BigUint,
    pub recipient: Address,
    /// Opaque attribution tag; empty or all-zero means the default source.
    #[serde(with = "hex_bytes", default)]
    pub auxiliary_data: Vec<u8>,
}

/// Pool-share token transfer. Only helper-routed transfers matter to the
/// aggregates (deposit attribution fix-ups).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    #[serde(with = "display_string")]
    pub amount: BigUint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveDepositedEvent {
    /// Long-tail asset of the cove deposited into.
    pub asset: Address,
    pub depositor: Address,
    /// Deposited cove share tokens.
    #[serde(with = "display_string")]
    pub pool_tokens: BigUint,
    /// Cove deposit-share supply after the operation; zero means
    /// "not reported".
    #[serde(with = "display_string")]
    pub deposit_supply: BigUint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveWithdrawnEvent {
    pub asset: Address,
    pub withdrawer: Address,
    #[serde(with = "display_string")]
    pub pool_tokens: BigUint,
    #[serde(with = "display_string")]
    pub deposit_supply: BigUint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveSwappedEvent {
    /// Zero address means the native asset.
    pub in_asset: Address,
    pub out_asset: Address,
    #[serde(with = "display_string")]
    pub in_amount: BigUint,
    #[serde(with = "display_string")]
    pub out_amount: BigUint,
    pub recipient: Address,
    #[serde(with = "hex_bytes", default)]
    pub auxiliary_data: Vec<u8>,
}

/// Streams envelopes line by line from any buffered reader.
pub struct EventFeed<R> {
    lines: std::io::Lines<R>,
    line_number: usize,
}

impl<R: BufRead> EventFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventFeed<R> {
    type Item = IndexerResult<EventEnvelope>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    return Some(Err(IndexerError::Processing(format!(
                        "event feed read failed: {err}"
                    ))))
                }
            };
            self.line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(trimmed).map_err(|err| {
                IndexerError::Processing(format!(
                    "malformed event on line {}: {err}",
                    self.line_number
                ))
            }));
        }
    }
}

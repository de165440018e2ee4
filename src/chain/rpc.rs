//! JSON-RPC `eth_call` client.
//!
//! Implements only the view calls the indexer needs, with fixed selectors
//! and hand-decoded return words, instead of pulling in a full contract
//! binding stack.

use std::time::Duration;

use num_bigint::{BigInt, BigUint};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ChainReader, ChainResult};
use crate::config::RpcConfig;
use crate::core::error::ChainError;
use crate::core::types::Address;

// keccak-256 prefixes of the canonical signatures
const SEL_SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41]; // symbol()
const SEL_NAME: [u8; 4] = [0x06, 0xfd, 0xde, 0x03]; // name()
const SEL_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67]; // decimals()
const SEL_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31]; // balanceOf(address)
const SEL_TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd]; // totalSupply()
const SEL_N_TOKENS: [u8; 4] = [0x1b, 0x6a, 0x87, 0x59]; // nTokens()
const SEL_TOKEN_AT: [u8; 4] = [0x92, 0xa9, 0x1a, 0x3a]; // tokenAt(uint256)
const SEL_LATEST_ROUND_DATA: [u8; 4] = [0xfe, 0xaf, 0x96, 0x8c]; // latestRoundData()
const SEL_LAST_BALANCES: [u8; 4] = [0xec, 0xc7, 0x63, 0x3d]; // lastBalances(address)
const SEL_DEPOSIT_SUPPLY_OF: [u8; 4] = [0xf4, 0x7a, 0xeb, 0x67]; // depositSupplyOf(address)

pub struct EthRpcClient {
    endpoint: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl EthRpcClient {
    pub fn new(config: &RpcConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            endpoint: config.endpoint.clone(),
            agent,
        }
    }

    fn eth_call(
        &self,
        contract: &Address,
        calldata: Vec<u8>,
        call: &'static str,
    ) -> ChainResult<Vec<u8>> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {"to": contract.to_string(), "data": format!("0x{}", hex::encode(&calldata))},
                "latest",
            ],
        });
        debug!(%contract, call, "eth_call");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|err| ChainError::Transport(err.to_string()))?;
        let text = response
            .into_string()
            .map_err(|err| ChainError::Transport(err.to_string()))?;
        let parsed: RpcResponse =
            serde_json::from_str(&text).map_err(|err| ChainError::Transport(err.to_string()))?;

        if let Some(error) = parsed.error {
            // nodes surface reverts as execution errors on eth_call
            if error.message.contains("revert") {
                return Err(ChainError::Reverted {
                    contract: contract.to_string(),
                    call,
                });
            }
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = parsed.result.ok_or_else(|| ChainError::Decode {
            call,
            reason: "empty rpc result".to_string(),
        })?;
        let stripped = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(stripped).map_err(|err| ChainError::Decode {
            call,
            reason: err.to_string(),
        })
    }
}

impl ChainReader for EthRpcClient {
    fn token_symbol(&self, token: &Address) -> ChainResult<String> {
        let data = self.eth_call(token, selector_only(SEL_SYMBOL), "symbol")?;
        decode_string(&data, "symbol")
    }

    fn token_name(&self, token: &Address) -> ChainResult<String> {
        let data = self.eth_call(token, selector_only(SEL_NAME), "name")?;
        decode_string(&data, "name")
    }

    fn token_decimals(&self, token: &Address) -> ChainResult<u32> {
        let data = self.eth_call(token, selector_only(SEL_DECIMALS), "decimals")?;
        decode_u32(&data, 0, "decimals")
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> ChainResult<BigUint> {
        let data = self.eth_call(token, encode_address(SEL_BALANCE_OF, owner), "balanceOf")?;
        decode_uint(&data, 0, "balanceOf")
    }

    fn total_supply(&self, token: &Address) -> ChainResult<BigUint> {
        let data = self.eth_call(token, selector_only(SEL_TOTAL_SUPPLY), "totalSupply")?;
        decode_uint(&data, 0, "totalSupply")
    }

    fn n_tokens(&self, pool: &Address) -> ChainResult<u32> {
        let data = self.eth_call(pool, selector_only(SEL_N_TOKENS), "nTokens")?;
        decode_u32(&data, 0, "nTokens")
    }

    fn token_at(&self, pool: &Address, index: u32) -> ChainResult<Address> {
        let data = self.eth_call(pool, encode_uint(SEL_TOKEN_AT, index), "tokenAt")?;
        decode_address(&data, 0, "tokenAt")
    }

    fn oracle_latest_answer(&self, oracle: &Address) -> ChainResult<BigInt> {
        let data = self.eth_call(
            oracle,
            selector_only(SEL_LATEST_ROUND_DATA),
            "latestRoundData",
        )?;
        // (roundId, answer, startedAt, updatedAt, answeredInRound)
        decode_int(&data, 1, "latestRoundData")
    }

    fn oracle_decimals(&self, oracle: &Address) -> ChainResult<u32> {
        let data = self.eth_call(oracle, selector_only(SEL_DECIMALS), "decimals")?;
        decode_u32(&data, 0, "decimals")
    }

    fn cove_last_balances(&self, controller: &Address, asset: &Address) -> ChainResult<BigUint> {
        let data = self.eth_call(
            controller,
            encode_address(SEL_LAST_BALANCES, asset),
            "lastBalances",
        )?;
        decode_uint(&data, 0, "lastBalances")
    }

    fn cove_deposit_supply(&self, controller: &Address, asset: &Address) -> ChainResult<BigUint> {
        let data = self.eth_call(
            controller,
            encode_address(SEL_DEPOSIT_SUPPLY_OF, asset),
            "depositSupplyOf",
        )?;
        decode_uint(&data, 0, "depositSupplyOf")
    }
}

// --- calldata encoding ---

fn selector_only(selector: [u8; 4]) -> Vec<u8> {
    selector.to_vec()
}

fn encode_address(selector: [u8; 4], address: &Address) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(36);
    calldata.extend_from_slice(&selector);
    calldata.extend_from_slice(&[0u8; 12]);
    calldata.extend_from_slice(address.as_bytes());
    calldata
}

fn encode_uint(selector: [u8; 4], value: u32) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(36);
    calldata.extend_from_slice(&selector);
    let mut word = [0u8; 32];
    word[28..].copy_from_slice(&value.to_be_bytes());
    calldata.extend_from_slice(&word);
    calldata
}

// --- return word decoding ---

fn word<'a>(data: &'a [u8], index: usize, call: &'static str) -> ChainResult<&'a [u8]> {
    data.get(index * 32..(index + 1) * 32)
        .ok_or_else(|| ChainError::Decode {
            call,
            reason: format!("return data too short for word {index}"),
        })
}

fn decode_uint(data: &[u8], index: usize, call: &'static str) -> ChainResult<BigUint> {
    Ok(BigUint::from_bytes_be(word(data, index, call)?))
}

fn decode_int(data: &[u8], index: usize, call: &'static str) -> ChainResult<BigInt> {
    Ok(BigInt::from_signed_bytes_be(word(data, index, call)?))
}

fn decode_u32(data: &[u8], index: usize, call: &'static str) -> ChainResult<u32> {
    let value = decode_uint(data, index, call)?;
    u32::try_from(&value).map_err(|_| ChainError::Decode {
        call,
        reason: format!("uint {value} exceeds u32"),
    })
}

fn decode_address(data: &[u8], index: usize, call: &'static str) -> ChainResult<Address> {
    let w = word(data, index, call)?;
    Address::from_slice(&w[12..]).ok_or_else(|| ChainError::Decode {
        call,
        reason: "address word malformed".to_string(),
    })
}

/// Dynamic `string` returns are offset + length + bytes; a bare 32-byte
/// result is a legacy `bytes32` value padded with nulls.
fn decode_string(data: &[u8], call: &'static str) -> ChainResult<String> {
    if data.len() == 32 {
        let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
        return Ok(String::from_utf8_lossy(&trimmed).into_owned());
    }

    let offset = decode_usize(data, 0, call)?;
    let length_word = data.get(offset..offset + 32).ok_or_else(|| ChainError::Decode {
        call,
        reason: "string offset out of range".to_string(),
    })?;
    let length = usize::try_from(&BigUint::from_bytes_be(length_word)).map_err(|_| {
        ChainError::Decode {
            call,
            reason: "string length overflow".to_string(),
        }
    })?;
    let bytes = data
        .get(offset + 32..offset + 32 + length)
        .ok_or_else(|| ChainError::Decode {
            call,
            reason: "string body out of range".to_string(),
        })?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn decode_usize(data: &[u8], index: usize, call: &'static str) -> ChainResult<usize> {
    let value = decode_uint(data, index, call)?;
    usize::try_from(&value).map_err(|_| ChainError::Decode {
        call,
        reason: format!("uint {value} exceeds usize"),
    })
}

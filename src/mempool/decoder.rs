//! Universal Router Calldata Decoder
//!
//! Purpose:
//!     Extract a single-hop V3 exact-input swap from pending Universal Router
//!     `execute` calldata. Anything else (multi-hop, exact-out, V2, other
//!     contracts) is reported as "not a candidate" rather than an error.
//!
//! Created: 2026-10-19
//!
//! Dependencies:
//!     - alloy (sol! call decoding, params decoding)
//!
//! Supported Function Selectors:
//!     0x3593564c - execute(bytes,bytes[],uint256)
//!     0x24856bc3 - execute(bytes,bytes[])
//!
//! Notes:
//!     - Command bytes carry flags in the top two bits (0x80 = allow revert);
//!       only the low six bits select the command
//!     - The first V3_SWAP_EXACT_IN command wins; later commands are ignored

use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};
use tracing::trace;

use super::types::SwapDescriptor;
use crate::contracts::{IUniversalRouter, IUniversalRouterNoDeadline};

// ── Universal Router commands ───────────────────────────────────────
pub const V3_SWAP_EXACT_IN: u8 = 0x00;
pub const COMMAND_TYPE_MASK: u8 = 0x3f;

// ── Router sentinels ────────────────────────────────────────────────
/// Recipient placeholder for msg.sender
pub const MSG_SENDER: Address = address!("0000000000000000000000000000000000000001");
/// Recipient placeholder for the router itself
pub const ADDRESS_THIS: Address = address!("0000000000000000000000000000000000000002");
/// amountIn placeholder: spend the router's whole balance (1 << 255)
pub const CONTRACT_BALANCE: U256 = U256::from_limbs([0, 0, 0, 1 << 63]);

/// tokenIn (20) + fee (3) + tokenOut (20)
const SINGLE_HOP_PATH_LEN: usize = 43;

/// abi.decode(input, (address, uint256, uint256, bytes, bool))
type V3SwapExactInInput = (Address, U256, U256, Bytes, bool);

#[derive(Debug, Clone)]
pub struct CandidateTxDecoder {
    router: Address,
}

impl CandidateTxDecoder {
    pub fn new(router: Address) -> Self {
        Self { router }
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Decode router calldata into a swap descriptor.
    /// Returns None if the transaction is not a single-hop V3 exact-in swap.
    pub fn decode(&self, calldata: &[u8], value: U256, sender: Address) -> Option<SwapDescriptor> {
        let (commands, inputs, deadline) = decode_execute(calldata)?;

        let Some(command_index) = commands
            .iter()
            .position(|c| c & COMMAND_TYPE_MASK == V3_SWAP_EXACT_IN)
        else {
            trace!("No V3 exact-in command | commands=0x{}", alloy::hex::encode(&commands));
            return None;
        };
        let input = inputs.get(command_index)?;

        let (recipient, amount_in, amount_out_minimum, path, payer_is_user) =
            match <V3SwapExactInInput as SolValue>::abi_decode_params(input) {
                Ok(decoded) => decoded,
                Err(e) => {
                    trace!("Malformed V3_SWAP_EXACT_IN input | index={} | {}", command_index, e);
                    return None;
                }
            };

        let (token_in, fee_tier, token_out) = decode_single_hop_path(&path)?;

        let recipient = if recipient == MSG_SENDER {
            sender
        } else if recipient == ADDRESS_THIS {
            self.router
        } else {
            recipient
        };

        let amount_in = if amount_in == CONTRACT_BALANCE {
            // Router spends what the caller sent along (WETH wrap flow)
            if value.is_zero() {
                return None;
            }
            value
        } else {
            amount_in
        };

        Some(SwapDescriptor {
            recipient,
            amount_in,
            amount_out_minimum,
            token_in,
            token_out,
            fee_tier,
            payer_is_sender: payer_is_user,
            command_index,
            deadline,
        })
    }
}

/// Split `execute` calldata into (commands, inputs, deadline).
fn decode_execute(calldata: &[u8]) -> Option<(Bytes, Vec<Bytes>, Option<U256>)> {
    if calldata.len() < 4 {
        return None;
    }

    let selector: [u8; 4] = calldata[..4].try_into().ok()?;
    if selector == IUniversalRouter::executeCall::SELECTOR {
        let call = IUniversalRouter::executeCall::abi_decode(calldata).ok()?;
        Some((call.commands, call.inputs, Some(call.deadline)))
    } else if selector == IUniversalRouterNoDeadline::executeCall::SELECTOR {
        let call = IUniversalRouterNoDeadline::executeCall::abi_decode(calldata).ok()?;
        Some((call.commands, call.inputs, None))
    } else {
        trace!("Unknown selector: {}", selector_hex(calldata));
        None
    }
}

/// Decode a V3 path that holds exactly one hop.
/// Layout: tokenIn (20) | fee (3, big-endian) | tokenOut (20)
pub fn decode_single_hop_path(path: &[u8]) -> Option<(Address, u32, Address)> {
    if path.len() != SINGLE_HOP_PATH_LEN {
        return None;
    }

    let token_in = Address::from_slice(&path[0..20]);
    let fee = u32::from_be_bytes([0, path[20], path[21], path[22]]);
    let token_out = Address::from_slice(&path[23..43]);

    Some((token_in, fee, token_out))
}

/// Get the 4-byte selector as a hex string (for logging).
pub fn selector_hex(input: &[u8]) -> String {
    if input.len() < 4 {
        return "0x".to_string();
    }
    format!("0x{}", alloy::hex::encode(&input[..4]))
}

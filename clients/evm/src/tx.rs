//! Transaction requests and their assembly into signable transactions.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;

/// A contract call to be signed and submitted by a `ChainClient`.
///
/// Only the target and calldata are chosen by the caller; nonce, sender and
/// chain id are filled in at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Short name used in logs and errors, e.g. `withdraw`
    pub label: String,
    /// Contract being called
    pub to: Address,
    /// ABI-encoded calldata
    pub input: Bytes,
    /// Native value attached to a payable call
    pub value: Option<U256>,
}

impl TxRequest {
    /// Encodes `call` against the contract at `to`.
    pub fn call<C: SolCall>(label: impl Into<String>, to: Address, call: &C) -> Self {
        Self {
            label: label.into(),
            to,
            input: Bytes::from(call.abi_encode()),
            value: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// The 4-byte function selector of the calldata, if present.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.input.get(..4).and_then(|s| s.try_into().ok())
    }

    /// Decodes the calldata as `C`, returning `None` when the selector does not match.
    pub fn decode<C: SolCall>(&self) -> Option<C> {
        if self.selector()? != C::SELECTOR {
            return None;
        }
        C::abi_decode(&self.input).ok()
    }
}

/// What is kept from a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Assembles the transaction for `request` sent by `from` with the given nonce and chain id.
///
/// Gas limit and fees are left unset so the provider's fillers estimate them
/// at the current network price.
pub fn build_transaction(
    request: &TxRequest,
    from: Address,
    nonce: u64,
    chain_id: u64,
) -> TransactionRequest {
    let tx = TransactionRequest::default()
        .with_from(from)
        .with_to(request.to)
        .with_input(request.input.clone())
        .with_nonce(nonce)
        .with_chain_id(chain_id);
    match request.value {
        Some(value) => tx.with_value(value),
        None => tx,
    }
}

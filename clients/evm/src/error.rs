//! Error type for chain reads and transaction submission.

use alloy::primitives::{Address, B256};
use thiserror::Error;

/// Failure talking to the chain.
///
/// Reads, quotes and writes fail differently: a failed read may be retried, a
/// missing quote means the pair cannot be priced, and a failed transaction
/// leaves whatever state earlier transactions committed.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain read `{what}` failed: {message}")]
    Read { what: String, message: String },

    #[error("no quote for {from} -> {to}: {message}")]
    QuoteUnavailable {
        from: Address,
        to: Address,
        message: String,
    },

    #[error("transaction `{label}` failed: {message}")]
    Transaction { label: String, message: String },

    #[error("transaction `{label}` reverted in {hash}")]
    Reverted { label: String, hash: B256 },

    #[error("transaction `{label}` ({hash}) was not mined before the receipt timeout")]
    Timeout { label: String, hash: B256 },
}

impl ChainError {
    pub fn read(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Read {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn transaction(label: impl Into<String>, message: impl ToString) -> Self {
        Self::Transaction {
            label: label.into(),
            message: message.to_string(),
        }
    }

    /// True for any failure raised while submitting or mining a transaction.
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            Self::Transaction { .. } | Self::Reverted { .. } | Self::Timeout { .. }
        )
    }
}

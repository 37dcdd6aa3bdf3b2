mod client;
mod config;
pub mod contracts;
pub mod dex;
mod error;
mod tx;

pub use client::{AlloyChainClient, ChainClient};
pub use config::{ChainClientConfig, DexConfig, FANTOM_CHAIN_ID};
pub use dex::{PairReserves, NATIVE};
pub use error::ChainError;
pub use tx::{build_transaction, TxReceipt, TxRequest};

//! Tomb-fork harvesting strategy.
//!
//! Claims farm rewards, stakes or sells them, compounds into LP positions and
//! bridges realized profit, all through an injected `ChainClient`.

mod actions;
mod compound;
pub mod config;
mod error;
pub mod fork;
mod pipeline;
mod record;
mod settle;

#[cfg(test)]
mod test_support;

pub use compound::{compound, CompoundOutcome};
pub use config::{EnvSettings, HarvestConfig, SettlementCurrency};
pub use error::{ConfigError, HarvestError, Result};
pub use fork::{based_fork, catalog, Fork, ForkSet, DEFAULT_FORKS};
pub use pipeline::{split_profit, ForkOutcome, Harvester, RunSummary, SkipReason};
pub use record::{RecordSink, RunLog, RunRecord};
pub use settle::settle;

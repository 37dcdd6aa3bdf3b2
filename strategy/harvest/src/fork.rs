//! Tomb-fork farm integrations and the ordered set of forks to harvest.

use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const BASED_REWARD_POOL: &str = "0xAc0fa95058616D7539b6Eecb6418A68e7c18A746";
const BASED_MASONRY: &str = "0xe5009dd5912a68b0d7c6f874cd0b4492c9f0e5cd";
const BSHARE_TOKEN: &str = "0x49C290Ff692149A4E16611c694fdED42C954ab7a";
const BASED_TOKEN: &str = "0x8D7d3409881b51466B483B11Ea1B8A03cdEd89ae";
const WFTM: &str = "0x21be370D5312f44cB42ce377BC9b8a0cEF1A4C83";

/// One farm integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    /// Reward pool paying out the shares token
    pub reward_pool: Address,
    /// Boardroom where the shares token is staked
    pub masonry: Address,
    /// Token the reward pool pays out
    pub shares_token: Address,
    /// The fork's pegged token, when known
    pub underlying_token: Option<Address>,
    /// Pool index inside the reward pool
    pub pool_id: u64,
    /// Asset paired with the shares token when compounding; `None` disables compounding
    pub lp_partner: Option<Address>,
}

impl Fork {
    /// Builds a fork from raw address strings.
    ///
    /// Any case is accepted; addresses are stored as bytes and display in
    /// checksum form.
    pub fn new(
        reward_pool: &str,
        masonry: &str,
        shares_token: &str,
        underlying_token: Option<&str>,
        pool_id: u64,
        lp_partner: Option<&str>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            reward_pool: parse_address("reward_pool", reward_pool)?,
            masonry: parse_address("masonry", masonry)?,
            shares_token: parse_address("shares_token", shares_token)?,
            underlying_token: underlying_token
                .map(|a| parse_address("underlying_token", a))
                .transpose()?,
            pool_id,
            lp_partner: lp_partner
                .map(|a| parse_address("lp_partner", a))
                .transpose()?,
        })
    }

    pub fn supports_compounding(&self) -> bool {
        self.lp_partner.is_some()
    }
}

/// Parses a hex address, reporting which field was malformed.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

/// A Based Finance pool on the shared BSHARE reward pool and masonry.
pub fn based_fork(pool_id: u64, lp_partner: Option<&str>) -> Result<Fork, ConfigError> {
    Fork::new(
        BASED_REWARD_POOL,
        BASED_MASONRY,
        BSHARE_TOKEN,
        Some(BASED_TOKEN),
        pool_id,
        lp_partner,
    )
}

/// Forks keyed by name, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkSet {
    entries: Vec<(String, Fork)>,
}

impl ForkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fork`, replacing an existing entry of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, fork: Fork) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = fork,
            None => self.entries.push((name, fork)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Fork> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fork)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subset of this set with the given names, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<ForkSet, ConfigError> {
        let mut selected = ForkSet::new();
        for name in names {
            let name = name.as_ref();
            let fork = self
                .get(name)
                .ok_or_else(|| ConfigError::UnknownFork(name.to_string()))?;
            selected.insert(name, fork.clone());
        }
        Ok(selected)
    }
}

/// Names harvested when no selection is given.
pub const DEFAULT_FORKS: [&str; 4] = ["BASED-TOMB", "BSHARE-FTM", "BASED-GEIST", "BASED-TRI"];

/// Every fork this harvester knows about.
pub fn catalog() -> Result<ForkSet, ConfigError> {
    let mut forks = ForkSet::new();
    forks.insert("BASED-TOMB", based_fork(0, None)?);
    forks.insert("BSHARE-FTM", based_fork(1, Some(WFTM))?);
    forks.insert("BASED-GEIST", based_fork(3, None)?);
    forks.insert("BASED-TRI", based_fork(4, None)?);
    forks.insert(
        "2SHARES",
        Fork::new(
            "0x8d426eb8c7e19b8f13817b07c0ab55d30d209a96",
            "0x627a83b6f8743c89d58f17f994d3f7f69c32f461",
            "0xc54A1684fD1bef1f077a336E6be4Bd9a3096a6Ca",
            None,
            1,
            None,
        )?,
    );
    // 3OMB and 3SHARES are two pools of the same reward pool.
    for (name, pool_id) in [("3OMB", 0), ("3SHARES", 2)] {
        forks.insert(
            name,
            Fork::new(
                "0x1040085d268253e8d4f932399a8019f527e58d04",
                "0x32c7bb562e7ecc15bed153ea731bc371dc7ff379",
                "0x6437adac543583c4b31bf0323a0870430f5cc2e7",
                None,
                pool_id,
                None,
            )?,
        );
    }
    forks.insert(
        "TOMB",
        Fork::new(
            "0xcc0a87F7e7c693042a9Cc703661F5060c80ACb43",
            "0x8764DE60236C5843D9faEB1B638fbCE962773B67",
            "0x4cdF39285D7Ca8eB3f090fDA0C069ba5F4145B37",
            Some("0x6c021Ae822BEa943b2E66552bDe1D2696a53fbB7"),
            1,
            None,
        )?,
    );
    forks.insert(
        "MAGIK",
        Fork::new(
            "0x38f006eb9c6778d02351fbd5966f829e7c4445d7",
            "0xac55a55676657d793d965ffa1ccc550b95535634",
            "0xc8ca9026ad0882133ef126824f6852567c571a4e",
            None,
            0,
            None,
        )?,
    );
    Ok(forks)
}

use std::{
    collections::{HashMap, HashSet},
    net::Ipv4Addr,
    sync::Arc,
};

use arc_swap::ArcSwap;
use ip_proxy_common::{Country, Direction, Reputation, ReputationGroup};

/// Immutable policy snapshot read by every inspection.
///
/// Categories without an entry are not configured and never block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Reported for completeness; geolocation is enforced regardless of this flag.
    pub geolocation_enabled: bool,
    pub geolocation: HashMap<Country, Direction>,
    pub reputation_enabled: bool,
    pub reputation_groups: HashMap<ReputationGroup, Direction>,
    /// Per-category overrides, consulted for the TOR group only.
    pub reputation_categories: HashMap<Reputation, Direction>,
    /// Sources exempt from the LAN time restriction.
    pub ip_whitelist: HashSet<Ipv4Addr>,
    /// Local hosts allowed to reach TOR outbound.
    pub tor_whitelist: HashSet<Ipv4Addr>,
}

impl Policy {
    pub fn country_block(&self, country: Country) -> Direction {
        self.geolocation.get(&country).copied().unwrap_or_default()
    }

    /// Blocking direction for a matched reputation category.
    ///
    /// TOR sub-categories are looked up individually and fall back to the
    /// TOR group entry; every other category is configured per group.
    pub fn reputation_block(&self, reputation: Reputation) -> Direction {
        let Some(group) = reputation.group() else {
            return Direction::Off;
        };

        let specific = match group {
            ReputationGroup::Tor => self.reputation_categories.get(&reputation),
            _ => None,
        };

        specific
            .or_else(|| self.reputation_groups.get(&group))
            .copied()
            .unwrap_or_default()
    }
}

/// Holds the current [`Policy`] for concurrent readers, replaced wholesale on reconfiguration.
pub struct PolicyStore {
    current: ArcSwap<Policy>,
}

impl PolicyStore {
    pub fn new(policy: Policy) -> Self {
        Self {
            current: ArcSwap::from_pointee(policy),
        }
    }

    pub fn load(&self) -> Arc<Policy> {
        self.current.load_full()
    }

    pub fn replace(&self, policy: Policy) {
        self.current.store(Arc::new(policy));
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

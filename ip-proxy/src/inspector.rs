
use ip_proxy_common::{Category, Country, Direction, Reputation, ReputationGroup, Verdict};

use crate::{classifier::Classifier, packet::Packet, policy::Policy};

/// Name reported for reputation when the lookup did not run.
pub const REPUTATION_NOT_LOOKED_UP: &str = "DNL";

/// Outcome of inspecting a single packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectionResult {
    pub verdict: Verdict,
    pub country: Country,
    /// `None` when reputation was not evaluated for this packet.
    pub reputation: Option<Reputation>,
}

impl InspectionResult {
    pub fn country_name(&self) -> &'static str {
        self.country.name()
    }

    pub fn reputation_name(&self) -> &'static str {
        self.reputation
            .map_or(REPUTATION_NOT_LOOKED_UP, Category::name)
    }
}

/// Classifies the remote endpoint of `packet` and applies `policy` to it.
///
/// Geolocation is always enforced. Reputation is only evaluated when enabled
/// and when geolocation accepted the packet.
pub fn inspect<C, P>(classifier: &C, policy: &Policy, packet: &P) -> InspectionResult
where
    C: Classifier + ?Sized,
    P: Packet + ?Sized,
{
    let key = packet.address_key();
    if key.is_none() {
        // fail open: an unreadable key matches no signature
        tracing::debug!(zone = ?packet.zone(), "packet has no usable address key");
    }

    let direction = packet.direction();
    let country = key.map_or(Country::NONE, |key| classifier.country(key));

    let mut verdict = Verdict::Accept;
    if country != Country::NONE {
        verdict = block_if(policy.country_block(country), direction);
    }

    let mut reputation = None;
    if verdict == Verdict::Accept && policy.reputation_enabled {
        let category = key.map_or(Reputation::NONE, |key| classifier.reputation(key));
        if category != Reputation::NONE {
            verdict = reputation_action(policy, category, packet);
        }
        reputation = Some(category);
    }

    InspectionResult {
        verdict,
        country,
        reputation,
    }
}

fn reputation_action<P>(policy: &Policy, category: Reputation, packet: &P) -> Verdict
where
    P: Packet + ?Sized,
{
    let direction = packet.direction();

    // the TOR whitelist lets a local user reach TOR, it never opens a host to inbound TOR traffic
    if category.group() == Some(ReputationGroup::Tor)
        && direction == Direction::Outbound
        && policy.tor_whitelist.contains(&packet.local_address())
    {
        return Verdict::Accept;
    }

    block_if(policy.reputation_block(category), direction)
}

#[inline]
fn block_if(configured: Direction, packet: Direction) -> Verdict {
    if configured.blocks(packet) {
        Verdict::Drop
    } else {
        Verdict::Accept
    }
}

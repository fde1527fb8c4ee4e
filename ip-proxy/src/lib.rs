//! Inline IP proxy for a LAN/WAN/DMZ gateway.
//!
//! Every intercepted IPv4 packet is classified by geolocation and reputation
//! of its remote endpoint, checked against the configured policy and handed
//! back to the interception layer with a single disposition. Blocked WAN
//! traffic is always deferred to the IPS.
mod classifier;
mod config;
mod error;
mod forwarder;
mod inspector;
mod logger;
mod packet;
mod policy;
mod proxy;
mod restrict;
mod test_packet;

pub use crate::proxy::{IpProxy, ProxyStats};
pub use ip_proxy_common::{
    Category, Country, Direction, Mark, Protocol, Queue, Reputation, ReputationGroup,
    SearchStrategy, SignatureEntry, SignatureError, SignatureIndex, Verdict, Zone,
};

pub use classifier::{Classifier, SignatureStore, Signatures};
pub use config::{GeolocationConfig, ProxyConfig, ReputationConfig, TimeRestrictionConfig};
pub use error::Error;
pub use forwarder::Forwarder;
pub use inspector::{inspect, InspectionResult, REPUTATION_NOT_LOOKED_UP};
#[cfg(feature = "tokio")]
pub use logger::ChannelSink;
pub use logger::{LogSink, PacketLogEntry, TracingSink};
pub use packet::{Packet, PacketContext, Terminator};
pub use policy::{Policy, PolicyStore};
pub use restrict::{LanRestriction, RestrictionWindow};
pub type Result<T> = std::result::Result<T, Error>;

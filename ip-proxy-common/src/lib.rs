mod category;
mod signature_index;

pub use category::{Category, Country, Reputation, ReputationGroup};
pub use signature_index::{SearchStrategy, SignatureEntry, SignatureError, SignatureIndex};

use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

/// Decision produced by inspection for a single packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accept,
    Drop,
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Accept
    }
}

/// Traffic direction relative to the protected network.
///
/// Used both as the direction of a packet and as the configured blocking
/// direction of a category, where `Off` means the category is not blocked.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Off = 0,
    Outbound = 1,
    Inbound = 2,
    Both = 3,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Off
    }
}

impl Direction {
    /// Whether a block configured for `self` applies to a packet travelling in `packet`.
    #[inline]
    pub fn blocks(self, packet: Direction) -> bool {
        match self {
            Direction::Off => false,
            Direction::Both => true,
            configured => configured == packet,
        }
    }
}

/// Ingress zone of a packet.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    Lan = 10,
    Wan = 11,
    Dmz = 12,
}

/// Transport protocol of a packet, by IP protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
    Other(u8),
}

impl Protocol {
    pub fn from_number(proto: u8) -> Self {
        match proto {
            0x01 => Self::Icmp,
            0x06 => Self::Tcp,
            0x11 => Self::Udp,
            other => Self::Other(other),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Icmp => 0x01,
            Self::Tcp => 0x06,
            Self::Udp => 0x11,
            Self::Other(proto) => proto,
        }
    }

    /// TCP and UDP connections get an active teardown when blocked.
    #[inline]
    pub fn is_terminable(self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }
}

/// Packet marks understood by the downstream processing stages.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Mark {
    LanZoneFirewall = 0x0B,
    DmzZoneFirewall = 0x0C,
    SendToIps = 0x15,
    IpProxyDrop = 0x19,
}

/// Interception queues packets can be forwarded to.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Queue {
    IpsIds = 2,
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case(0x01, Protocol::Icmp)]
    #[test_case(0x06, Protocol::Tcp)]
    #[test_case(0x11, Protocol::Udp)]
    #[test_case(0x2F, Protocol::Other(0x2F))]
    fn protocol_from_ip_header_number(number: u8, expected: Protocol) {
        let protocol = Protocol::from_number(number);
        assert_eq!(protocol, expected);
        assert_eq!(protocol.number(), number);
    }

    #[test_case(0x06, true)]
    #[test_case(0x11, true)]
    #[test_case(0x01, false)]
    #[test_case(0x32, false)]
    fn only_tcp_and_udp_are_terminable(number: u8, expected: bool) {
        assert_eq!(Protocol::from_number(number).is_terminable(), expected);
    }

    #[test_case(Direction::Off, Direction::Inbound, false)]
    #[test_case(Direction::Both, Direction::Outbound, true)]
    #[test_case(Direction::Inbound, Direction::Inbound, true)]
    #[test_case(Direction::Inbound, Direction::Outbound, false)]
    fn configured_direction_blocks(configured: Direction, packet: Direction, expected: bool) {
        assert_eq!(configured.blocks(packet), expected);
    }
}

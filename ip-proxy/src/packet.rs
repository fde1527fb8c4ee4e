use std::{net::Ipv4Addr, sync::Arc};

use ip_proxy_common::{Direction, Mark, Protocol, Queue, Zone};
use serde::Serialize;

use crate::Result;

/// Handle on an intercepted packet, owned by the interception layer.
///
/// Accessors are read-only. Exactly one of [`discard`](Packet::discard),
/// [`repeat`](Packet::repeat) or [`forward`](Packet::forward) is issued per
/// packet; [`update_mark`](Packet::update_mark) only precedes the last two.
pub trait Packet {
    fn zone(&self) -> Zone;
    fn direction(&self) -> Direction;
    fn protocol(&self) -> Protocol;
    fn source_address(&self) -> Ipv4Addr;
    /// Address of the protected host, used for whitelist matching.
    fn local_address(&self) -> Ipv4Addr;
    /// Numeric form of the remote endpoint used for signature lookups.
    ///
    /// `None` when the packet could not be parsed; such packets match no signature.
    fn address_key(&self) -> Option<u32>;

    fn update_mark(&mut self, mark: Mark) -> Result<()>;
    /// Drop verdict.
    fn discard(&mut self) -> Result<()>;
    /// Re-submit to the current queue with the updated mark.
    fn repeat(&mut self) -> Result<()>;
    fn forward(&mut self, queue: Queue) -> Result<()>;

    fn context(&self) -> PacketContext {
        PacketContext {
            zone: self.zone(),
            direction: self.direction(),
            protocol: self.protocol(),
            source_ip: self.source_address(),
            local_ip: self.local_address(),
            address_key: self.address_key(),
        }
    }
}

/// Owned snapshot of a packet's attributes, safe to hand to log sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketContext {
    pub zone: Zone,
    pub direction: Direction,
    pub protocol: Protocol,
    pub source_ip: Ipv4Addr,
    pub local_ip: Ipv4Addr,
    pub address_key: Option<u32>,
}

/// Sends a teardown response for a blocked connection (TCP reset or the UDP equivalent).
pub trait Terminator<P: Packet>: Send + Sync {
    fn terminate(&self, packet: &P) -> Result<()>;
}

impl<P: Packet, T: Terminator<P> + ?Sized> Terminator<P> for Arc<T> {
    fn terminate(&self, packet: &P) -> Result<()> {
        (**self).terminate(packet)
    }
}

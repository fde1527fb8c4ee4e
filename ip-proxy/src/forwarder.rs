
use ip_proxy_common::{Mark, Queue, Verdict, Zone};

use crate::{
    packet::{Packet, Terminator},
    Result,
};

/// Turns a verdict into the packet's disposition for its ingress zone.
///
/// | zone     | accept                       | drop                                   |
/// |----------|------------------------------|----------------------------------------|
/// | LAN      | mark LAN firewall, repeat    | drop                                   |
/// | DMZ      | mark DMZ firewall, repeat    | drop                                   |
/// | WAN      | mark send-to-IPS, forward    | mark proxy-drop, forward to the IPS    |
///
/// Blocked WAN traffic is handed to the IPS, which drops it after profiling
/// the remote host for scans and denial of service. Blocked TCP and UDP
/// connections are also torn down, whatever the zone.
#[derive(Debug, Clone, Default)]
pub struct Forwarder<T> {
    terminator: T,
}

impl<T> Forwarder<T> {
    pub fn new(terminator: T) -> Self {
        Self { terminator }
    }

    pub fn terminator(&self) -> &T {
        &self.terminator
    }

    /// Issues exactly one disposition on `packet`.
    ///
    /// A rejected command leaves the packet to the interception layer and is
    /// returned without retrying.
    pub fn forward<P>(&self, packet: &mut P, zone: Zone, verdict: Verdict) -> Result<()>
    where
        P: Packet,
        T: Terminator<P>,
    {
        match verdict {
            Verdict::Accept => Self::on_accept(packet, zone),
            Verdict::Drop => {
                let disposition = Self::on_drop(packet, zone);
                if packet.protocol().is_terminable() {
                    if let Err(error) = self.terminator.terminate(packet) {
                        tracing::warn!(%error, ?zone, "could not tear down blocked connection");
                    }
                }
                disposition
            }
        }
    }

    fn on_accept<P: Packet>(packet: &mut P, zone: Zone) -> Result<()> {
        match zone {
            Zone::Wan => {
                packet.update_mark(Mark::SendToIps)?;
                packet.forward(Queue::IpsIds)
            }
            Zone::Lan => {
                packet.update_mark(Mark::LanZoneFirewall)?;
                packet.repeat()
            }
            Zone::Dmz => {
                packet.update_mark(Mark::DmzZoneFirewall)?;
                packet.repeat()
            }
        }
    }

    fn on_drop<P: Packet>(packet: &mut P, zone: Zone) -> Result<()> {
        match zone {
            Zone::Lan | Zone::Dmz => packet.discard(),
            Zone::Wan => {
                packet.update_mark(Mark::IpProxyDrop)?;
                packet.forward(Queue::IpsIds)
            }
        }
    }
}

use std::{net::Ipv4Addr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use ip_proxy::{
    ChannelSink, Country, Direction, IpProxy, Mark, Packet, Policy, Protocol, ProxyConfig, Queue,
    Reputation, SignatureIndex, Signatures, Terminator, Zone,
};
use ipnet::Ipv4Net;

#[derive(Debug, Parser)]
pub struct Opt {
    /// JSON proxy configuration; a built-in policy is used when omitted.
    #[clap(short, long)]
    config: Option<PathBuf>,
}

/// Stand-in for a queued packet, printing every command it receives.
struct ReplayPacket {
    zone: Zone,
    direction: Direction,
    protocol: Protocol,
    remote: Ipv4Addr,
    local: Ipv4Addr,
}

impl ReplayPacket {
    /// `protocol` is the IP header protocol number.
    fn new(zone: Zone, direction: Direction, protocol: u8, remote: &str) -> Self {
        Self {
            zone,
            direction,
            protocol: Protocol::from_number(protocol),
            remote: remote.parse().unwrap(),
            local: Ipv4Addr::new(192, 168, 1, 20),
        }
    }
}

impl Packet for ReplayPacket {
    fn zone(&self) -> Zone {
        self.zone
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn source_address(&self) -> Ipv4Addr {
        match self.direction {
            Direction::Outbound => self.local,
            _ => self.remote,
        }
    }

    fn local_address(&self) -> Ipv4Addr {
        self.local
    }

    fn address_key(&self) -> Option<u32> {
        Some(u32::from(self.remote))
    }

    fn update_mark(&mut self, mark: Mark) -> ip_proxy::Result<()> {
        tracing::debug!(remote = %self.remote, ?mark, "mark");
        Ok(())
    }

    fn discard(&mut self) -> ip_proxy::Result<()> {
        tracing::info!(remote = %self.remote, "discard");
        Ok(())
    }

    fn repeat(&mut self) -> ip_proxy::Result<()> {
        tracing::info!(remote = %self.remote, "repeat");
        Ok(())
    }

    fn forward(&mut self, queue: Queue) -> ip_proxy::Result<()> {
        tracing::info!(remote = %self.remote, ?queue, "forward");
        Ok(())
    }
}

struct LoggingTerminator;

impl Terminator<ReplayPacket> for LoggingTerminator {
    fn terminate(&self, packet: &ReplayPacket) -> ip_proxy::Result<()> {
        tracing::info!(remote = %packet.remote, protocol = ?packet.protocol, "teardown sent");
        Ok(())
    }
}

fn signatures() -> Result<Signatures, anyhow::Error> {
    let net = |cidr: &str| cidr.parse::<Ipv4Net>();
    let geolocation = SignatureIndex::from_networks([
        (net("5.8.0.0/16")?, Country::Russia),
        (net("8.8.8.0/24")?, Country::UnitedStates),
        (net("1.0.1.0/24")?, Country::China),
    ])?;
    let reputation = SignatureIndex::from_networks([
        (net("185.220.101.0/24")?, Reputation::TorExit),
        (net("45.33.32.0/24")?, Reputation::CommandControl),
    ])?;
    Ok(Signatures::new(geolocation, reputation))
}

fn default_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config
        .geolocation
        .countries
        .insert(Country::Russia, Direction::Both);
    config
        .geolocation
        .countries
        .insert(Country::China, Direction::Inbound);
    config.reputation.enabled = true;
    config
        .reputation
        .groups
        .insert(ip_proxy::ReputationGroup::Malicious, Direction::Both);
    config
        .reputation
        .groups
        .insert(ip_proxy::ReputationGroup::Tor, Direction::Outbound);
    config
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let opt = Opt::parse();
    tracing_subscriber::fmt::init();

    let config = match opt.config {
        Some(path) => ProxyConfig::from_path(path)?,
        None => default_config(),
    };
    let policy: Policy = config.policy();
    tracing::info!(
        countries = policy.geolocation.len(),
        reputation = policy.reputation_enabled,
        "policy loaded"
    );

    let (sink, writer) = ChannelSink::spawn(1024);
    let proxy = IpProxy::from_config(&config, signatures()?, LoggingTerminator, sink)?;
    let refresher = Arc::clone(proxy.restriction()).spawn_refresher(Duration::from_secs(30));

    let mut packets = [
        ReplayPacket::new(Zone::Wan, Direction::Inbound, 6, "5.8.12.40"),
        ReplayPacket::new(Zone::Wan, Direction::Inbound, 17, "8.8.8.8"),
        ReplayPacket::new(Zone::Lan, Direction::Outbound, 6, "1.0.1.7"),
        ReplayPacket::new(Zone::Lan, Direction::Outbound, 6, "185.220.101.4"),
        ReplayPacket::new(Zone::Dmz, Direction::Inbound, 1, "45.33.32.156"),
        ReplayPacket::new(Zone::Dmz, Direction::Inbound, 6, "203.0.113.9"),
    ];
    for packet in &mut packets {
        proxy.handle(packet);
    }

    tracing::info!(stats = ?proxy.stats(), "replay finished");

    refresher.abort();
    drop(proxy);
    writer.await?;

    Ok(())
}

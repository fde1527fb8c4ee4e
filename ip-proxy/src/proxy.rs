mod test;

use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use ip_proxy_common::Verdict;
use serde::Serialize;

use crate::{
    classifier::{Classifier, SignatureStore, Signatures},
    config::ProxyConfig,
    forwarder::Forwarder,
    inspector::{inspect, InspectionResult},
    logger::LogSink,
    packet::{Packet, Terminator},
    policy::{Policy, PolicyStore},
    restrict::LanRestriction,
    Result,
};

/// Inline IP proxy: LAN restriction, inspection, forwarding and logging for
/// every packet pulled from the interception queue.
///
/// All state is read through snapshots, so one proxy can be shared by any
/// number of queue workers while signatures and policy are reloaded.
///
/// # Example
/// ```
/// # use std::{net::Ipv4Addr, sync::Arc};
/// # use ip_proxy::{
/// #     Direction, IpProxy, Mark, Packet, Protocol, ProxyConfig, Queue, Result,
/// #     SignatureIndex, Signatures, Terminator, TracingSink, Zone,
/// # };
/// # struct Nfq { key: u32, verdict: Option<Queue> }
/// # impl Packet for Nfq {
/// #     fn zone(&self) -> Zone { Zone::Wan }
/// #     fn direction(&self) -> Direction { Direction::Inbound }
/// #     fn protocol(&self) -> Protocol { Protocol::Tcp }
/// #     fn source_address(&self) -> Ipv4Addr { Ipv4Addr::from(self.key) }
/// #     fn local_address(&self) -> Ipv4Addr { Ipv4Addr::new(192, 168, 1, 2) }
/// #     fn address_key(&self) -> Option<u32> { Some(self.key) }
/// #     fn update_mark(&mut self, _: Mark) -> Result<()> { Ok(()) }
/// #     fn discard(&mut self) -> Result<()> { Ok(()) }
/// #     fn repeat(&mut self) -> Result<()> { Ok(()) }
/// #     fn forward(&mut self, q: Queue) -> Result<()> { self.verdict = Some(q); Ok(()) }
/// # }
/// # struct Reset;
/// # impl Terminator<Nfq> for Reset {
/// #     fn terminate(&self, _: &Nfq) -> Result<()> { Ok(()) }
/// # }
/// let config = ProxyConfig::from_json(r#"{ "geolocation": { "countries": { "RUSSIA": "inbound" } } }"#)?;
/// let signatures = Signatures::new(
///     SignatureIndex::new([(1000, 2000, 643)])?,
///     SignatureIndex::default(),
/// );
/// let proxy = IpProxy::from_config(&config, signatures, Reset, TracingSink)?;
///
/// let mut packet = Nfq { key: 1500, verdict: None };
/// proxy.handle(&mut packet);
/// assert_eq!(packet.verdict, Some(Queue::IpsIds));
/// assert_eq!(proxy.stats().dropped, 1);
/// # Ok::<(), ip_proxy::Error>(())
/// ```
pub struct IpProxy<T, L, C = Signatures> {
    signatures: Arc<SignatureStore<C>>,
    policy: Arc<PolicyStore>,
    restriction: Arc<LanRestriction>,
    forwarder: Forwarder<T>,
    sink: L,
    stats: Stats,
}

impl<T, L, C> IpProxy<T, L, C>
where
    L: LogSink,
    C: Classifier,
{
    pub fn new(signatures: C, policy: Policy, terminator: T, sink: L) -> Self {
        Self {
            signatures: Arc::new(SignatureStore::new(signatures)),
            policy: Arc::new(PolicyStore::new(policy)),
            restriction: Arc::new(LanRestriction::default()),
            forwarder: Forwarder::new(terminator),
            sink,
            stats: Stats::default(),
        }
    }

    pub fn from_config(config: &ProxyConfig, signatures: C, terminator: T, sink: L) -> Result<Self> {
        let window = config.restriction_window()?;
        let proxy = Self::new(signatures, config.policy(), terminator, sink);
        proxy.restriction.set_window(window);
        Ok(proxy)
    }

    /// Shares an externally scheduled restriction instead of the proxy's own.
    pub fn with_restriction(self, restriction: Arc<LanRestriction>) -> Self {
        Self {
            restriction,
            ..self
        }
    }

    pub fn signatures(&self) -> &Arc<SignatureStore<C>> {
        &self.signatures
    }

    pub fn policy(&self) -> &Arc<PolicyStore> {
        &self.policy
    }

    pub fn restriction(&self) -> &Arc<LanRestriction> {
        &self.restriction
    }

    /// Runs one packet through the proxy, issuing exactly one disposition on it.
    pub fn handle<P>(&self, packet: &mut P)
    where
        P: Packet,
        T: Terminator<P>,
    {
        let policy = self.policy.load();

        match self.restriction.pre_inspect(packet, &policy.ip_whitelist) {
            Ok(true) => {}
            Ok(false) => {
                self.stats.restricted.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(error) => {
                self.stats.disposition_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(%error, "restricted packet could not be dropped");
                return;
            }
        }

        let result = self.inspect_with(&policy, &*packet);
        self.stats.record(result.verdict);
        let zone = packet.zone();
        if let Err(error) = self.forwarder.forward(packet, zone, result.verdict) {
            self.stats.disposition_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(%error, ?zone, verdict = ?result.verdict, "packet disposition failed");
        }

        self.sink.log(&packet.context(), &result);
    }

    /// Inspects `packet` against the current snapshots without acting on it.
    ///
    /// Not counted in [`stats`](Self::stats).
    pub fn inspect<P: Packet>(&self, packet: &P) -> InspectionResult {
        let policy = self.policy.load();
        self.inspect_with(&policy, packet)
    }

    fn inspect_with<P: Packet>(&self, policy: &Policy, packet: &P) -> InspectionResult {
        let signatures = self.signatures.load();
        inspect(&*signatures, policy, packet)
    }

    /// Rebuilds the signature tables; a failed build keeps the current ones.
    pub fn reload_signatures<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce() -> Result<C>,
    {
        self.signatures.reload_with(build).map_err(|error| {
            self.sink.reload_failed("signatures", &error);
            error
        })
    }

    /// Applies a new configuration; an invalid one keeps the current policy and window.
    pub fn reload_config(&self, config: &ProxyConfig) -> Result<()> {
        let window = config.restriction_window().map_err(|error| {
            self.sink.reload_failed("policy", &error);
            error
        })?;

        self.policy.replace(config.policy());
        self.restriction.set_window(window);
        tracing::info!("policy reloaded");
        Ok(())
    }

    pub fn reload_config_from_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let config = ProxyConfig::from_path(path).map_err(|error| {
            self.sink.reload_failed("policy", &error);
            error
        })?;
        self.reload_config(&config)
    }

    pub fn stats(&self) -> ProxyStats {
        self.stats.snapshot()
    }
}

#[derive(Debug, Default)]
struct Stats {
    inspected: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    restricted: AtomicU64,
    disposition_failures: AtomicU64,
}

impl Stats {
    fn record(&self, verdict: Verdict) {
        self.inspected.fetch_add(1, Ordering::Relaxed);
        match verdict {
            Verdict::Accept => self.accepted.fetch_add(1, Ordering::Relaxed),
            Verdict::Drop => self.dropped.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> ProxyStats {
        ProxyStats {
            inspected: self.inspected.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            restricted: self.restricted.load(Ordering::Relaxed),
            disposition_failures: self.disposition_failures.load(Ordering::Relaxed),
        }
    }
}

/// Counters since the proxy was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProxyStats {
    pub inspected: u64,
    pub accepted: u64,
    pub dropped: u64,
    /// Dropped by the LAN time restriction before inspection.
    pub restricted: u64,
    pub disposition_failures: u64,
}

use std::{net::Ipv4Addr, sync::Arc};

use ip_proxy_common::{Direction, Protocol, Verdict, Zone};
use serde::Serialize;

use crate::{inspector::InspectionResult, packet::PacketContext, Error};

/// Write-only destination for inspection records.
///
/// Called on the packet path, so implementations must not block.
pub trait LogSink: Send + Sync {
    fn log(&self, packet: &PacketContext, result: &InspectionResult);

    /// A signature or policy reload failed and the previous snapshot stays in use.
    fn reload_failed(&self, source: &str, error: &Error) {
        tracing::error!(%error, source, "reload failed, keeping last good snapshot");
    }
}

impl<L: LogSink + ?Sized> LogSink for Arc<L> {
    fn log(&self, packet: &PacketContext, result: &InspectionResult) {
        (**self).log(packet, result)
    }

    fn reload_failed(&self, source: &str, error: &Error) {
        (**self).reload_failed(source, error)
    }
}

/// One inspected packet as written to the `packet_log` target.
#[derive(Debug, Clone, Serialize)]
pub struct PacketLogEntry {
    pub timestamp: String,
    pub zone: Zone,
    pub direction: Direction,
    pub protocol: Protocol,
    pub source_ip: Ipv4Addr,
    pub local_ip: Ipv4Addr,
    pub country: &'static str,
    pub reputation: &'static str,
    pub action: Verdict,
}

impl PacketLogEntry {
    pub fn new(packet: &PacketContext, result: &InspectionResult) -> Self {
        let timestamp =
            chrono::offset::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        Self {
            timestamp,
            zone: packet.zone,
            direction: packet.direction,
            protocol: packet.protocol,
            source_ip: packet.source_ip,
            local_ip: packet.local_ip,
            country: result.country_name(),
            reputation: result.reputation_name(),
            action: result.verdict,
        }
    }
}

/// Writes every record as JSON to `info` level of the [tracing] crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn emit(&self, entry: &PacketLogEntry) {
        if let Some(line) = Self::render(entry) {
            tracing::info!(target: "packet_log", "{line}");
        }
    }

    fn render(entry: &PacketLogEntry) -> Option<String> {
        match serde_json::to_string(entry) {
            Ok(line) => Some(line),
            Err(error) => {
                tracing::debug!(%error, "packet log entry could not be serialized, record lost");
                None
            }
        }
    }
}

impl LogSink for TracingSink {
    fn log(&self, packet: &PacketContext, result: &InspectionResult) {
        self.emit(&PacketLogEntry::new(packet, result));
    }
}

#[cfg(feature = "tokio")]
pub use channel::ChannelSink;

#[cfg(feature = "tokio")]
mod channel {
    use std::sync::atomic::{AtomicU64, Ordering};

    use tokio::{
        spawn,
        sync::mpsc::{self, error::TrySendError},
        task::JoinHandle,
    };

    use super::{LogSink, PacketLogEntry, TracingSink};
    use crate::{inspector::InspectionResult, packet::PacketContext};

    /// Hands records to a background task so the packet path never waits on output.
    ///
    /// Records are dropped and counted when the buffer is full.
    #[derive(Debug)]
    pub struct ChannelSink {
        sender: mpsc::Sender<PacketLogEntry>,
        dropped: AtomicU64,
    }

    impl ChannelSink {
        /// Spawns the writer task on the current tokio runtime.
        ///
        /// A `capacity` of zero is raised to one.
        pub fn spawn(capacity: usize) -> (Self, JoinHandle<()>) {
            let (sink, receiver) = Self::new(capacity);
            let handle = spawn(write_entries(receiver, TracingSink));
            (sink, handle)
        }

        pub(crate) fn new(capacity: usize) -> (Self, mpsc::Receiver<PacketLogEntry>) {
            let (sender, receiver) = mpsc::channel(capacity.max(1));
            (
                Self {
                    sender,
                    dropped: AtomicU64::new(0),
                },
                receiver,
            )
        }

        pub fn dropped(&self) -> u64 {
            self.dropped.load(Ordering::Relaxed)
        }
    }

    impl LogSink for ChannelSink {
        fn log(&self, packet: &PacketContext, result: &InspectionResult) {
            match self.sender.try_send(PacketLogEntry::new(packet, result)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped.is_power_of_two() {
                        tracing::warn!(dropped, "packet log buffer full, records lost");
                    }
                }
            }
        }
    }

    async fn write_entries(mut receiver: mpsc::Receiver<PacketLogEntry>, sink: TracingSink) {
        while let Some(entry) = receiver.recv().await {
            sink.emit(&entry);
        }
    }

}

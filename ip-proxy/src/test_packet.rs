#![cfg(test)]

use std::{
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use ip_proxy_common::{Country, Direction, Mark, Protocol, Queue, Reputation, Zone};

use crate::{
    classifier::{Classifier, Signatures},
    inspector::InspectionResult,
    logger::LogSink,
    packet::{Packet, PacketContext, Terminator},
    Error, Result,
};

pub(crate) const LAN_HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Mark(Mark),
    Discard,
    Repeat,
    Forward(Queue),
}

/// Packet double recording every command issued on it.
#[derive(Debug, Clone)]
pub(crate) struct TestPacket {
    pub zone: Zone,
    pub direction: Direction,
    pub protocol: Protocol,
    pub source: Ipv4Addr,
    pub local: Ipv4Addr,
    pub key: Option<u32>,
    pub commands: Vec<Command>,
    pub reject_commands: bool,
}

impl TestPacket {
    pub fn new(zone: Zone, direction: Direction, key: u32) -> Self {
        Self {
            zone,
            direction,
            protocol: Protocol::Tcp,
            source: LAN_HOST,
            local: LAN_HOST,
            key: Some(key),
            commands: Vec::new(),
            reject_commands: false,
        }
    }

    pub fn with_protocol(self, protocol: Protocol) -> Self {
        Self { protocol, ..self }
    }

    pub fn with_local(self, local: Ipv4Addr) -> Self {
        Self { local, ..self }
    }

    pub fn with_source(self, source: Ipv4Addr) -> Self {
        Self { source, ..self }
    }

    pub fn with_key(self, key: Option<u32>) -> Self {
        Self { key, ..self }
    }

    pub fn rejecting_commands(self) -> Self {
        Self {
            reject_commands: true,
            ..self
        }
    }

    /// Terminal commands issued, marks excluded.
    pub fn dispositions(&self) -> Vec<Command> {
        self.commands
            .iter()
            .copied()
            .filter(|c| !matches!(c, Command::Mark(_)))
            .collect()
    }

    pub fn mark(&self) -> Option<Mark> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::Mark(mark) => Some(*mark),
            _ => None,
        })
    }

    fn issue(&mut self, command: Command) -> Result<()> {
        if self.reject_commands {
            return Err(Error::Disposition(format!("{command:?} rejected")));
        }
        self.commands.push(command);
        Ok(())
    }
}

impl Packet for TestPacket {
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
        self.source
    }

    fn local_address(&self) -> Ipv4Addr {
        self.local
    }

    fn address_key(&self) -> Option<u32> {
        self.key
    }

    fn update_mark(&mut self, mark: Mark) -> Result<()> {
        self.issue(Command::Mark(mark))
    }

    fn discard(&mut self) -> Result<()> {
        self.issue(Command::Discard)
    }

    fn repeat(&mut self) -> Result<()> {
        self.issue(Command::Repeat)
    }

    fn forward(&mut self, queue: Queue) -> Result<()> {
        self.issue(Command::Forward(queue))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingTerminator {
    pub calls: AtomicUsize,
}

impl RecordingTerminator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Terminator<TestPacket> for RecordingTerminator {
    fn terminate(&self, _packet: &TestPacket) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    pub entries: Mutex<Vec<(PacketContext, InspectionResult)>>,
    pub reload_failures: Mutex<Vec<String>>,
}

impl LogSink for MemorySink {
    fn log(&self, packet: &PacketContext, result: &InspectionResult) {
        self.entries.lock().unwrap().push((*packet, *result));
    }

    fn reload_failed(&self, source: &str, error: &Error) {
        self.reload_failures
            .lock()
            .unwrap()
            .push(format!("{source}: {error}"));
    }
}

/// Wraps real signatures and counts lookups.
#[derive(Debug, Default)]
pub(crate) struct CountingClassifier {
    pub inner: Signatures,
    pub lookups: AtomicUsize,
}

impl CountingClassifier {
    pub fn new(inner: Signatures) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Classifier for CountingClassifier {
    fn country(&self, key: u32) -> Country {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.country(key)
    }

    fn reputation(&self, key: u32) -> Reputation {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.reputation(key)
    }
}


use std::{
    collections::HashSet,
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use arc_swap::ArcSwapOption;
use chrono::{Duration, Local, NaiveTime};
use ip_proxy_common::Zone;

use crate::{packet::Packet, Error, Result};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Daily wall-clock window during which LAN access is restricted.
///
/// The window may wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionWindow {
    start: NaiveTime,
    length: Duration,
}

impl RestrictionWindow {
    pub fn new(start: NaiveTime, length_minutes: u32) -> Result<Self> {
        if length_minutes == 0 || length_minutes > MINUTES_PER_DAY {
            return Err(Error::InvalidWindow(format!(
                "length must be between 1 and {MINUTES_PER_DAY} minutes, got {length_minutes}"
            )));
        }

        Ok(Self {
            start,
            length: Duration::minutes(i64::from(length_minutes)),
        })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let offset = time
            .signed_duration_since(self.start)
            .num_seconds()
            .rem_euclid(SECONDS_PER_DAY);
        offset < self.length.num_seconds()
    }
}

/// LAN time restriction state.
///
/// `active` is derived from the window by [`refresh_at`](Self::refresh_at),
/// which the scheduler calls periodically. The packet path only reads the flag.
#[derive(Debug, Default)]
pub struct LanRestriction {
    window: ArcSwapOption<RestrictionWindow>,
    active: AtomicBool,
    // serialises writers so `active` always reflects the stored window
    update: Mutex<()>,
}

impl LanRestriction {
    pub fn new(window: Option<RestrictionWindow>) -> Self {
        let restriction = Self::default();
        restriction.set_window(window);
        restriction
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn window(&self) -> Option<RestrictionWindow> {
        self.window.load().as_deref().copied()
    }

    /// Replaces the window and re-evaluates it against the local clock.
    pub fn set_window(&self, window: Option<RestrictionWindow>) {
        let _guard = self.lock_update();
        self.window.store(window.map(Arc::new));
        self.evaluate(Local::now().time());
    }

    pub fn refresh(&self) -> bool {
        self.refresh_at(Local::now().time())
    }

    /// Re-evaluates the window at `now`, returning the new state.
    pub fn refresh_at(&self, now: NaiveTime) -> bool {
        let _guard = self.lock_update();
        self.evaluate(now)
    }

    fn lock_update(&self) -> MutexGuard<'_, ()> {
        self.update.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evaluate(&self, now: NaiveTime) -> bool {
        let active = self
            .window
            .load()
            .as_ref()
            .is_some_and(|window| window.contains(now));

        let previous = self.active.swap(active, Ordering::AcqRel);
        if previous != active {
            tracing::info!(active, "LAN time restriction changed");
        }
        active
    }

    /// Returns `true` when the packet should go on to inspection.
    ///
    /// While restriction is active, LAN packets from sources outside the
    /// whitelist are dropped here.
    pub fn pre_inspect<P: Packet>(
        &self,
        packet: &mut P,
        whitelist: &HashSet<Ipv4Addr>,
    ) -> Result<bool> {
        if self.is_active()
            && packet.zone() == Zone::Lan
            && !whitelist.contains(&packet.source_address())
        {
            packet.discard()?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Re-evaluates the window every `period` until the task is aborted.
    #[cfg(feature = "tokio")]
    pub fn spawn_refresher(
        self: Arc<Self>,
        period: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.refresh();
            }
        })
    }
}

//! Usage polling supervisor.
//!
//! Drives the bridge's `status` operation on a fixed cadence and fans each
//! usage snapshot out to subscribers. A failed poll tears the poll timer
//! down and schedules a single delayed reconnection attempt; an explicit
//! disconnect cancels every timer deterministically. The cadence assumes a
//! local, low-latency subprocess, and the reconnect delay is fixed because
//! failures are expected to be transient local conditions, not remote
//! overload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::bridge::error::BridgeResult;
use crate::bridge::types::UsageSnapshot;
use crate::bridge::CostaCli;
use crate::sched::TaskSlot;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle of the stream. The two timer kinds live in dedicated slots,
/// so at most one of each exists at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Connecting,
    Polling,
    ReconnectScheduled,
}

/// Owner handle for the supervisor. Dropping it disconnects.
pub struct UsageStream {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    cli: CostaCli,
    poll_interval: Duration,
    reconnect_delay: Duration,
    phase: Mutex<StreamPhase>,
    poll_slot: TaskSlot,
    reconnect_slot: TaskSlot,
    /// Bumped on disconnect. A call that was in flight when the bump
    /// happened sees a stale epoch and must not re-arm anything.
    epoch: AtomicU64,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<UsageSnapshot>>>,
}

impl UsageStream {
    pub fn new(cli: CostaCli) -> Self {
        Self::with_intervals(cli, POLL_INTERVAL, RECONNECT_DELAY)
    }

    pub fn with_intervals(
        cli: CostaCli,
        poll_interval: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                cli,
                poll_interval,
                reconnect_delay,
                phase: Mutex::new(StreamPhase::Idle),
                poll_slot: TaskSlot::new(),
                reconnect_slot: TaskSlot::new(),
                epoch: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn phase(&self) -> StreamPhase {
        *self.inner.lock_phase()
    }

    /// Registers a subscriber. Every published snapshot is delivered to all
    /// receivers alive at publish time.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UsageSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock_subscribers().push(tx);
        rx
    }

    /// Connects and starts polling. Idempotent while a connection attempt
    /// is already in flight.
    pub async fn connect(&self) {
        StreamInner::connect(&self.inner).await;
    }

    /// Cancels all timers and returns the stream to idle. Safe to call in
    /// any phase; a subprocess call still in flight completes on its own
    /// but cannot re-arm anything afterwards.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// One status check: publishes a snapshot when the session is
    /// authenticated and reported any usage fields. An unauthenticated
    /// session is a normal outcome, not an error.
    pub async fn fetch_usage(&self) -> BridgeResult<Option<UsageSnapshot>> {
        self.inner.fetch_usage().await
    }
}

impl Drop for UsageStream {
    fn drop(&mut self) {
        self.inner.disconnect();
    }
}

impl StreamInner {
    async fn connect(self: &Arc<Self>) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        {
            let mut phase = self.lock_phase();
            // Reentrancy guard: a second connect while one is in flight
            // must not trigger a second fetch.
            if *phase == StreamPhase::Connecting {
                return;
            }
            *phase = StreamPhase::Connecting;
        }

        let outcome = self.fetch_usage().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            // Disconnected while the fetch was in flight; the phase is
            // already Idle and must stay that way.
            return;
        }

        match outcome {
            Ok(_) => self.start_polling(epoch),
            Err(err) => {
                warn!("usage connect failed: {}", err);
                self.schedule_reconnect(epoch);
            }
        }
    }

    fn start_polling(self: &Arc<Self>, epoch: u64) {
        *self.lock_phase() = StreamPhase::Polling;
        // A successful connect supersedes any pending reconnect attempt.
        self.reconnect_slot.cancel();

        let inner = Arc::clone(self);
        self.poll_slot.arm(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; the connect fetch already
            // covered that slot.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if inner.epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                // The fetch is awaited before the next tick is taken, so a
                // slow call (up to the 15s bridge limit) can never overlap
                // the following one.
                if let Err(err) = inner.fetch_usage().await {
                    warn!("usage poll failed: {}", err);
                    inner.schedule_reconnect(epoch);
                    break;
                }
            }
        }));
    }

    fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        *self.lock_phase() = StreamPhase::ReconnectScheduled;

        let inner = Arc::clone(self);
        // Arming replaces any reconnect already pending, so back-to-back
        // failures collapse into a single attempt.
        self.reconnect_slot.arm(tokio::spawn(async move {
            tokio::time::sleep(inner.reconnect_delay).await;
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            debug!("usage stream reconnecting");
            StreamInner::connect(&inner).await;
        }));
    }

    fn disconnect(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.poll_slot.cancel();
        self.reconnect_slot.cancel();
        *self.lock_phase() = StreamPhase::Idle;
    }

    async fn fetch_usage(&self) -> BridgeResult<Option<UsageSnapshot>> {
        let reply = self.cli.status().await?;
        if !reply.logged_in {
            debug!("costa session not authenticated; nothing to report");
            return Ok(None);
        }
        match UsageSnapshot::from_status(&reply) {
            Some(snapshot) => {
                self.publish(&snapshot);
                Ok(Some(snapshot))
            }
            None => {
                debug!("status reply carried no usage fields");
                Ok(None)
            }
        }
    }

    fn publish(&self, snapshot: &UsageSnapshot) {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn lock_phase(&self) -> MutexGuard<'_, StreamPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<UsageSnapshot>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/usage_stream_tests.rs"]
mod tests;

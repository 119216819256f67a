//! Polling refresh controller.
//!
//! One controller drives one view's data. It fetches through the [`Gateway`]
//! on activation, then on a fixed period, and on demand via
//! [`RefreshController::refresh_now`]. Results are published through a
//! `watch` channel so rendering surfaces only ever see read-only state.
//!
//! Overlapping fetches are ordered by start ticket: a result is applied only
//! if it was started after the last applied one, so a slow early fetch can
//! never overwrite a newer snapshot.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::matches::{DateRange, FetchResult, Gateway};

/// Dashboard auto-refresh period.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Repeat period after the first fetch; `None` disables auto-refresh
    pub period: Option<Duration>,
    /// Day bounds forwarded to every gateway fetch
    pub range: Option<DateRange>,
}

/// What a rendering surface sees.
#[derive(Debug, Clone)]
pub struct RefreshState {
    /// True until the first result (live or fallback) is applied
    pub loading: bool,
    /// True while at least one fetch is in flight
    pub refreshing: bool,
    pub result: Option<FetchResult>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Set once by `stop()`; nothing is published after it
    pub stopped: bool,
}

impl RefreshState {
    fn initial() -> Self {
        RefreshState {
            loading: true,
            refreshing: false,
            result: None,
            last_updated: None,
            stopped: false,
        }
    }
}

#[derive(Debug, Default)]
struct Tickets {
    /// Ticket of the most recently started fetch
    started: u64,
    /// Ticket of the result currently published
    applied: u64,
    in_flight: usize,
    stopped: bool,
}

struct Shared {
    gateway: Arc<Gateway>,
    range: Option<DateRange>,
    tickets: Mutex<Tickets>,
    state_tx: watch::Sender<RefreshState>,
}

impl Shared {
    fn tickets(&self) -> MutexGuard<'_, Tickets> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one fetch and publish it if it is still the newest. Returns
    /// whether the result was applied.
    async fn run_cycle(&self) -> bool {
        let (ticket, in_flight) = {
            let mut t = self.tickets();
            if t.stopped {
                return false;
            }
            t.started += 1;
            t.in_flight += 1;
            self.state_tx.send_modify(|s| s.refreshing = true);
            (t.started, InFlight::new(self))
        };

        let result = self.gateway.fetch(self.range.as_ref()).await;

        let mut t = in_flight.settle();
        if t.stopped {
            debug!("Fetch #{} completed after teardown, ignoring", ticket);
            return false;
        }
        let refreshing = t.in_flight > 0;

        if ticket <= t.applied {
            debug!(
                "Discarding fetch #{}: #{} is already applied",
                ticket, t.applied
            );
            self.state_tx.send_modify(|s| s.refreshing = refreshing);
            return false;
        }

        t.applied = ticket;
        let count = result.snapshot().len();
        let source = result.source();
        self.state_tx.send_modify(|s| {
            s.loading = false;
            s.refreshing = refreshing;
            s.last_updated = Some(result.snapshot().fetched_at());
            s.result = Some(result);
        });
        debug!("Applied fetch #{} ({} matches, {:?})", ticket, count, source);
        true
    }
}

/// Membership of one fetch in the in-flight count. Dropping it before
/// [`InFlight::settle`] (the fetch future was cancelled) still leaves the
/// count and republishes `refreshing`.
struct InFlight<'a> {
    shared: &'a Shared,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn new(shared: &'a Shared) -> Self {
        InFlight {
            shared,
            settled: false,
        }
    }

    /// Leave the in-flight count and hand back the locked tickets.
    fn settle(mut self) -> MutexGuard<'a, Tickets> {
        self.settled = true;
        let shared = self.shared;
        let mut t = shared.tickets();
        t.in_flight = t.in_flight.saturating_sub(1);
        t
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut t = self.shared.tickets();
        t.in_flight = t.in_flight.saturating_sub(1);
        if t.stopped {
            return;
        }
        let refreshing = t.in_flight > 0;
        debug!("Fetch cancelled, {} still in flight", t.in_flight);
        self.shared.state_tx.send_modify(|s| s.refreshing = refreshing);
    }
}

/// Cancellable handle over the scheduled refresh task.
pub struct RefreshController {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    period: Option<Duration>,
}

impl RefreshController {
    /// Spawn the refresh task. The first fetch starts immediately; repeats
    /// are scheduled `period` after it completes.
    pub fn start(gateway: Arc<Gateway>, options: RefreshOptions) -> Self {
        let (state_tx, _) = watch::channel(RefreshState::initial());
        let shared = Arc::new(Shared {
            gateway,
            range: options.range,
            tickets: Mutex::new(Tickets::default()),
            state_tx,
        });

        let period = options.period;
        let task_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            info!(
                "Refresh controller started (provider={}, period={:?})",
                task_shared.gateway.provider_name(),
                period
            );
            task_shared.run_cycle().await;

            let Some(period) = period else {
                return;
            };
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                task_shared.run_cycle().await;
            }
        });

        RefreshController {
            shared,
            task: Mutex::new(Some(task)),
            period,
        }
    }

    /// Fetch right now, independent of the schedule. Safe to call while a
    /// scheduled fetch is in flight. Returns whether this fetch's result was
    /// published.
    pub async fn refresh_now(&self) -> bool {
        self.shared.run_cycle().await
    }

    /// Read-only view of the published state.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.shared.state_tx.subscribe()
    }

    /// Copy of the current state.
    pub fn state(&self) -> RefreshState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.shared.gateway
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.tickets().stopped
    }

    /// Cancel the schedule. Fetches still in flight finish as no-ops.
    /// Idempotent.
    pub fn stop(&self) {
        {
            let mut t = self.shared.tickets();
            if t.stopped {
                return;
            }
            t.stopped = true;
            self.shared.state_tx.send_modify(|s| {
                s.stopped = true;
                s.refreshing = false;
            });
        }
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        info!("Refresh controller stopped");
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Flip scheduler: first-tick alignment, timer loop, cooperative shutdown.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use {
    serde::Serialize,
    tokio::{
        sync::{Mutex, RwLock},
        task::JoinHandle,
        time::Instant,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use curfew_metrics::{counter, histogram, scheduler as scheduler_metrics};

use curfew_channels::FlipReport;

use crate::{
    Error, Result,
    schedule::{Alignment, advance_deadline, first_tick_ms, format_ms, now_ms},
};

/// Callback running one flip pass.
pub type FlipFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = FlipReport> + Send>> + Send + Sync>;

/// Wall-clock source in epoch millis, used for first-tick alignment.
pub type ClockFn = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    WaitingFirstTick,
    Ticking,
    Stopped,
}

/// Snapshot of the scheduler for logs and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub interval_ms: u64,
    pub passes: u64,
    pub skipped_ticks: u64,
    pub next_tick_at_ms: Option<u64>,
    pub last_report: Option<FlipReport>,
}

pub struct FlipScheduler {
    interval: Duration,
    on_flip: FlipFn,
    clock: ClockFn,
    status: RwLock<SchedulerStatus>,
    cancel: CancellationToken,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl FlipScheduler {
    pub fn new(interval: Duration, on_flip: FlipFn) -> Arc<Self> {
        Self::with_clock(interval, on_flip, Arc::new(now_ms))
    }

    /// Create a scheduler that reads wall-clock time from `clock`.
    pub fn with_clock(interval: Duration, on_flip: FlipFn, clock: ClockFn) -> Arc<Self> {
        Arc::new(Self {
            interval,
            on_flip,
            clock,
            status: RwLock::new(SchedulerStatus {
                state: SchedulerState::Idle,
                interval_ms: interval.as_millis() as u64,
                passes: 0,
                skipped_ticks: 0,
                next_tick_at_ms: None,
                last_report: None,
            }),
            cancel: CancellationToken::new(),
            timer_handle: Mutex::new(None),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Compute the aligned first tick and spawn the timer loop.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        let now = (self.clock)();
        let first = first_tick_ms(now, self.interval);
        let first_delay = Duration::from_millis(first - now);
        {
            let mut status = self.status.write().await;
            if status.state != SchedulerState::Idle {
                return Err(Error::AlreadyStarted);
            }
            status.state = SchedulerState::WaitingFirstTick;
            status.next_tick_at_ms = Some(first);
        }

        info!(
            interval_ms = self.interval.as_millis() as u64,
            alignment = ?Alignment::for_interval(self.interval),
            first_tick = %format_ms(first),
            "flip scheduler started"
        );

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop(first, first_delay).await;
        });
        *self.timer_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop accepting ticks and wait for an in-flight pass to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.timer_handle.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "flip scheduler task ended abnormally");
        }
        let mut status = self.status.write().await;
        status.state = SchedulerState::Stopped;
        status.next_tick_at_ms = None;
        info!("flip scheduler stopped");
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: Arc<Self>, first_ms: u64, first_delay: Duration) {
        let origin = Instant::now();
        let mut deadline = first_delay;

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep_until(origin + deadline) => {},
            }

            let latency = origin.elapsed().saturating_sub(deadline);
            #[cfg(feature = "metrics")]
            histogram!(scheduler_metrics::TICK_LATENCY_SECONDS).record(latency.as_secs_f64());

            let tick_ms = first_ms + (deadline - first_delay).as_millis() as u64;
            debug!(
                tick = %format_ms(tick_ms),
                latency_ms = latency.as_millis() as u64,
                "flip tick"
            );
            self.status.write().await.state = SchedulerState::Ticking;

            let report = (self.on_flip)().await;

            let (next, skipped) = advance_deadline(deadline, self.interval, origin.elapsed());
            if skipped > 0 {
                warn!(
                    skipped,
                    interval_ms = self.interval.as_millis() as u64,
                    "flip pass overran its slot, skipping ticks"
                );
                #[cfg(feature = "metrics")]
                counter!(scheduler_metrics::TICKS_SKIPPED_TOTAL).increment(u64::from(skipped));
            }
            deadline = next;

            let next_ms = first_ms + (deadline - first_delay).as_millis() as u64;
            let mut status = self.status.write().await;
            status.passes += 1;
            status.skipped_ticks += u64::from(skipped);
            status.last_report = Some(report);
            status.next_tick_at_ms = Some(next_ms);
        }

        debug!("flip timer loop exited");
    }
}

use crate::backoff::{JitterMode, RetryPolicy};
use crate::client::retrier::ColdStartSink;
use crate::readiness::probe::HealthCheck;
use crate::readiness::state::{ProbeOutcome, ReadinessMachine, ReadinessStatus};
use crate::telemetry::counters;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Read-only view of the controller state, published through a watch
/// channel so any number of readers can observe the single writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessSnapshot {
    pub status: ReadinessStatus,
    pub attempts: u32,
    pub last_outcome: Option<ProbeOutcome>,
}

/// Drives a probing cycle against a [`HealthCheck`] with bounded,
/// exponentially backed-off attempts, then keeps the service warm with a
/// low-frequency ping once READY.
///
/// At most one cycle task exists per controller; `reset` and `shutdown`
/// cancel it, and an in-flight probe that lands afterwards is discarded
/// under the state lock.
#[derive(Clone)]
pub struct ReadinessController {
    inner: Arc<Inner>,
}

struct Inner {
    probe: Arc<dyn HealthCheck>,
    policy: RetryPolicy,
    jitter: JitterMode,
    probe_timeout: Duration,
    keep_alive: Duration,
    machine: RwLock<ReadinessMachine>,
    status_tx: watch::Sender<ReadinessSnapshot>,
    cycle: Mutex<Option<CancellationToken>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.cycle.lock() {
            if let Some(token) = guard.take() {
                token.cancel();
            }
        }
    }
}

impl Inner {
    fn publish(&self, machine: &ReadinessMachine) {
        self.status_tx.send_replace(ReadinessSnapshot {
            status: machine.status(),
            attempts: machine.attempts(),
            last_outcome: machine.last_outcome(),
        });
    }

    /// Cancels the current cycle task, if any, and installs `next` in its
    /// place.
    fn swap_cycle(&self, next: Option<CancellationToken>) {
        let previous = match self.cycle.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(_) => None,
        };
        if let Some(token) = previous {
            token.cancel();
        }
    }
}

impl ReadinessController {
    pub fn new(
        probe: Arc<dyn HealthCheck>,
        policy: RetryPolicy,
        jitter: JitterMode,
        probe_timeout: Duration,
        keep_alive: Duration,
    ) -> Self {
        let machine = ReadinessMachine::new(policy.max_attempts);
        let (status_tx, _) = watch::channel(ReadinessSnapshot {
            status: machine.status(),
            attempts: 0,
            last_outcome: None,
        });

        Self {
            inner: Arc::new(Inner {
                probe,
                policy,
                jitter,
                probe_timeout,
                keep_alive,
                machine: RwLock::new(machine),
                status_tx,
                cycle: Mutex::new(None),
            }),
        }
    }

    pub async fn snapshot(&self) -> ReadinessSnapshot {
        let machine = self.inner.machine.read().await;
        ReadinessSnapshot {
            status: machine.status(),
            attempts: machine.attempts(),
            last_outcome: machine.last_outcome(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadinessSnapshot> {
        self.inner.status_tx.subscribe()
    }

    /// Starts a probing cycle with attempt 0 scheduled immediately.
    /// A no-op unless the status is UNKNOWN.
    pub async fn start(&self) {
        let token = {
            let mut machine = self.inner.machine.write().await;
            if machine.begin().is_err() {
                return;
            }

            let token = CancellationToken::new();
            self.inner.swap_cycle(Some(token.clone()));
            self.inner.publish(&machine);
            token
        };

        tracing::info!(
            state_from = ReadinessStatus::Unknown.as_str(),
            state_to = ReadinessStatus::Probing.as_str(),
            reason = "start",
            "readiness state transition"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            probe_cycle(inner, token).await;
        });
    }

    /// Cancels any pending probe or keep-alive timer and returns the
    /// status to UNKNOWN. Callable at any time, including mid-cycle.
    pub async fn reset(&self) {
        let mut machine = self.inner.machine.write().await;
        self.inner.swap_cycle(None);

        let previous = machine.status();
        machine.reset();
        self.inner.publish(&machine);
        drop(machine);

        if previous != ReadinessStatus::Unknown {
            tracing::info!(
                state_from = previous.as_str(),
                state_to = ReadinessStatus::Unknown.as_str(),
                reason = "reset",
                "readiness state transition"
            );
        }
    }

    /// Teardown: cancels all pending timers. In-flight probe responses
    /// arriving afterwards never mutate state.
    pub fn shutdown(&self) {
        self.inner.swap_cycle(None);
    }

    /// Waits until the current cycle settles on READY or FAILED.
    pub async fn wait_until_settled(&self) -> ReadinessSnapshot {
        let mut rx = self.subscribe();
        loop {
            let snapshot = *rx.borrow_and_update();
            if snapshot.status.is_settled() {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return snapshot;
            }
        }
    }
}

#[async_trait]
impl ColdStartSink for ReadinessController {
    async fn service_went_cold(&self) {
        counters().record_cold_reset();
        self.reset().await;
    }
}

/// Sleeps for a duration but aborts early if the cycle token fires.
/// Returns `true` if cancellation occurred during the wait.
async fn sleep_with_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

async fn probe_cycle(inner: Arc<Inner>, token: CancellationToken) {
    loop {
        let outcome = tokio::select! {
            _ = token.cancelled() => return,
            outcome = inner.probe.check(inner.probe_timeout) => outcome,
        };
        counters().record_probe_outcome(outcome);

        let (status, attempts) = {
            let mut machine = inner.machine.write().await;
            if token.is_cancelled() {
                return;
            }
            let status = match machine.fold(outcome) {
                Ok(status) => status,
                Err(err) => {
                    tracing::warn!(error = %err, "discarding probe outcome");
                    return;
                }
            };
            inner.publish(&machine);
            (status, machine.attempts())
        };

        match status {
            ReadinessStatus::Ready => {
                tracing::info!(
                    state_from = ReadinessStatus::Probing.as_str(),
                    state_to = ReadinessStatus::Ready.as_str(),
                    reason = "probe_success",
                    attempts,
                    "readiness state transition"
                );
                break;
            }
            ReadinessStatus::Failed => {
                tracing::warn!(
                    state_from = ReadinessStatus::Probing.as_str(),
                    state_to = ReadinessStatus::Failed.as_str(),
                    reason = "attempts_exhausted",
                    attempts,
                    outcome = outcome.as_str(),
                    "readiness state transition"
                );
                return;
            }
            _ => {
                let delay = inner.jitter.apply(inner.policy.delay_for(attempts - 1));
                tracing::debug!(
                    attempt = attempts,
                    outcome = outcome.as_str(),
                    delay_ms = delay.as_millis() as u64,
                    "health probe failed; backing off"
                );
                if sleep_with_cancel(delay, &token).await {
                    return;
                }
            }
        }
    }

    // Keep-alive: a missed ping is logged, never a READY -> FAILED flip.
    loop {
        if sleep_with_cancel(inner.keep_alive, &token).await {
            return;
        }
        let outcome = tokio::select! {
            _ = token.cancelled() => return,
            outcome = inner.probe.check(inner.probe_timeout) => outcome,
        };
        counters().record_keep_alive(outcome);
        if !outcome.is_success() {
            tracing::warn!(outcome = outcome.as_str(), "keep-alive ping failed");
        }
    }
}

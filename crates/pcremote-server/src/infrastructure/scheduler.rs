//! Background loops: pairing-code rotation, housekeeping and metrics sampling.
//!
//! Every loop ticks on a `tokio::time::interval` and stops as soon as the
//! shared `CancellationToken` fires.  Rotation and housekeeping wait one full
//! period before their first tick: `PairingAuthority::new` has already issued
//! and announced a code, and there is nothing to sweep at startup.  Metrics
//! sampling ticks immediately so the first snapshot is available early.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::infrastructure::system_info::MetricsSampler;
use crate::AppState;

/// How many entries one housekeeping pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub tokens: usize,
    pub nonces: usize,
}

/// One housekeeping pass over every registry with expiring entries.
pub fn run_housekeeping(state: &AppState) -> SweepReport {
    let report = SweepReport {
        sessions: state.sessions.sweep_expired(),
        tokens: state.tokens.purge_expired(),
        nonces: state.nonces.sweep_expired(),
    };
    if report != SweepReport::default() {
        debug!(
            sessions = report.sessions,
            tokens = report.tokens,
            nonces = report.nonces,
            "housekeeping removed expired entries"
        );
    }
    report
}

/// An interval whose first tick is one full period away.
fn delayed_interval(every: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Rotates the pairing code every `every` until cancelled.
pub fn start_code_rotation(
    state: Arc<AppState>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = delayed_interval(every);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    state.pairing.rotate_code();
                }
            }
        }
        info!("pairing code rotation stopped");
    })
}

/// Runs [`run_housekeeping`] every `every` until cancelled.
pub fn start_housekeeping(
    state: Arc<AppState>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = delayed_interval(every);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    run_housekeeping(&state);
                }
            }
        }
        info!("housekeeping stopped");
    })
}

/// Samples host metrics into `state.metrics` every `every` until cancelled.
///
/// Sampling blocks (it walks the process table), so each pass runs on the
/// blocking pool.  The sampler moves into the blocking task and back out so
/// CPU and network deltas carry across passes.
pub fn start_metrics_sampling(
    state: Arc<AppState>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sampler: Option<MetricsSampler> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let current = sampler.take();
                    let sampled = tokio::task::spawn_blocking(move || {
                        let mut sampler = current.unwrap_or_default();
                        let snapshot = sampler.sample();
                        (sampler, snapshot)
                    })
                    .await;

                    match sampled {
                        Ok((kept, snapshot)) => {
                            state.metrics.publish(snapshot);
                            sampler = Some(kept);
                        }
                        Err(e) => {
                            error!(error = %e, "metrics sampling task failed");
                            break;
                        }
                    }
                }
            }
        }
        info!("metrics sampling stopped");
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive scheduler for bulk refresh passes.
//!
//! Instead of polling on a fixed period, the delay to the next pass is derived
//! after every pass from the soonest expiry across all tenants. At most one
//! timer task exists at a time; it sleeps, runs a pass, recomputes the delay,
//! and sleeps again until cancelled.
//!
//! Passes never overlap: scheduled passes and [`RefreshScheduler::run_now`]
//! both go through the same pass guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::credential::expiry::optimal_interval_minutes;
use crate::credential::{epoch_secs, validate};
use crate::refresh::orchestrator::RefreshOrchestrator;
use crate::refresh::PassReport;
use crate::store::CredentialStore;

/// Default delay before retrying when the next delay cannot be computed.
pub const DEFAULT_FALLBACK_RETRY_MINUTES: u64 = 30;

/// Largest accepted fallback delay: one week.
pub const MAX_FALLBACK_RETRY_MINUTES: u64 = 7 * 24 * 60;

/// Snapshot returned by [`RefreshScheduler::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub has_pending_timer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<u64>,
    pub passes_run: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pass: Option<PassReport>,
}

#[derive(Default)]
struct SchedulerState {
    running: bool,
    timer: Option<PendingTimer>,
    generation: u64,
}

struct PendingTimer {
    cancel: CancellationToken,
    next_run_at: u64,
    generation: u64,
}

pub struct RefreshScheduler {
    orchestrator: Arc<RefreshOrchestrator>,
    store: Arc<dyn CredentialStore>,
    fallback_retry: Duration,
    state: Mutex<SchedulerState>,
    pass_guard: tokio::sync::Mutex<()>,
    last_pass: Mutex<Option<PassReport>>,
    passes_run: AtomicU64,
}

impl RefreshScheduler {
    pub fn new(
        orchestrator: Arc<RefreshOrchestrator>,
        store: Arc<dyn CredentialStore>,
        fallback_retry: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            store,
            fallback_retry,
            state: Mutex::new(SchedulerState::default()),
            pass_guard: tokio::sync::Mutex::new(()),
            last_pass: Mutex::new(None),
            passes_run: AtomicU64::new(0),
        })
    }

    /// Start the scheduler: run one pass immediately, then arm the timer.
    ///
    /// Returns `false` without doing anything if already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let mut state = self.state.lock();
            if state.running {
                tracing::debug!("scheduler already running");
                return false;
            }
            state.running = true;
        }
        tracing::info!("refresh scheduler started");

        let report = self.execute_pass().await;
        let delay = self.next_delay(&report).await;
        self.arm(delay);
        true
    }

    /// Stop the scheduler and cancel any pending timer.
    ///
    /// An in-flight pass is left to complete. Returns whether it was running.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        let was_running = state.running;
        state.running = false;
        if let Some(timer) = state.timer.take() {
            timer.cancel.cancel();
        }
        drop(state);

        if was_running {
            tracing::info!("refresh scheduler stopped");
        }
        was_running
    }

    /// Run a pass now. When running, the pending timer is replaced by one
    /// derived from the post-pass expiration set.
    pub async fn run_now(self: &Arc<Self>) -> PassReport {
        let was_running = {
            let mut state = self.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.cancel.cancel();
            }
            state.running
        };

        let report = self.execute_pass().await;
        if was_running {
            let delay = self.next_delay(&report).await;
            self.arm(delay);
        }
        report
    }

    pub fn status(&self) -> SchedulerStatus {
        let (running, next_run_at) = {
            let state = self.state.lock();
            (state.running, state.timer.as_ref().map(|t| t.next_run_at))
        };
        SchedulerStatus {
            running,
            has_pending_timer: next_run_at.is_some(),
            next_run_at,
            passes_run: self.passes_run.load(Ordering::Relaxed),
            last_pass: self.last_pass.lock().clone(),
        }
    }

    /// Interval the current expiration set calls for, in minutes.
    pub async fn planned_interval_minutes(&self) -> anyhow::Result<u64> {
        let credentials = self.store.list_refreshable().await?;
        let expirations: Vec<u64> =
            credentials.iter().map(|c| validate::resolve_expiry(c).timestamp()).collect();
        Ok(optimal_interval_minutes(&expirations, epoch_secs()))
    }

    /// Delay until the next pass, from the current expiration set.
    ///
    /// Falls back to the fixed retry delay when the store cannot be read,
    /// including when the pass itself could not enumerate tenants.
    async fn next_delay(&self, report: &PassReport) -> Duration {
        if report.error.is_some() {
            return self.fallback_retry;
        }
        match self.planned_interval_minutes().await {
            Ok(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
            Err(e) => {
                tracing::warn!(err = %format!("{e:#}"), "cannot compute next refresh delay, using fallback");
                self.fallback_retry
            }
        }
    }

    /// Replace the pending timer with a new timer loop firing after `delay`.
    fn arm(self: &Arc<Self>, delay: Duration) {
        let (cancel, generation) = {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            if let Some(old) = state.timer.take() {
                old.cancel.cancel();
            }
            state.generation += 1;
            let cancel = CancellationToken::new();
            state.timer = Some(PendingTimer {
                cancel: cancel.clone(),
                next_run_at: epoch_secs().saturating_add(delay.as_secs()),
                generation: state.generation,
            });
            (cancel, state.generation)
        };

        tracing::info!(delay_secs = delay.as_secs(), "next refresh pass scheduled");
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.timer_loop(cancel, generation, delay).await;
        });
    }

    async fn timer_loop(&self, cancel: CancellationToken, generation: u64, mut delay: Duration) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let report = self.execute_pass().await;
            if cancel.is_cancelled() {
                return;
            }
            delay = self.next_delay(&report).await;

            {
                let mut state = self.state.lock();
                let running = state.running;
                match state.timer.as_mut() {
                    Some(timer) if running && timer.generation == generation => {
                        timer.next_run_at = epoch_secs().saturating_add(delay.as_secs());
                    }
                    _ => return,
                }
            }
            tracing::info!(delay_secs = delay.as_secs(), "next refresh pass scheduled");
        }
    }

    async fn execute_pass(&self) -> PassReport {
        let _guard = self.pass_guard.lock().await;
        let started_at = epoch_secs();
        let report = match self.orchestrator.run_pass().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(err = %format!("{e:#}"), "refresh pass failed");
                PassReport::enumeration_failed(
                    uuid::Uuid::new_v4().to_string(),
                    started_at,
                    epoch_secs(),
                    &e,
                )
            }
        };
        self.passes_run.fetch_add(1, Ordering::Relaxed);
        *self.last_pass.lock() = Some(report.clone());
        report
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

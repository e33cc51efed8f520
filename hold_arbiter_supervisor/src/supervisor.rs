//! Hold supervisor.
//!
//! Drives a hold from `start` to a single successful remote recheck. Every
//! wake-up derives its decision from the store alone, so a restarted process
//! resumes by re-reading the record; nothing in memory is needed for
//! correctness.
//!
//! Overlapping wake-ups are expected (scheduler slack, a slow recheck
//! outliving the next interval). The completion sequence is claimed through
//! `HoldStore::update`, so only one wake-up at a time calls the remote.

use chrono::{DateTime, Utc};

use hold_arbiter_core::ValidationError;

use crate::cfg::SupervisorCfg;
use crate::clock::{Clock, SystemClock};
use crate::error::{HoldError, RemoteCallError, StorageError};
use crate::fallback::{FallbackHandle, FallbackTimer};
use crate::record::{HoldRecord, HoldStatus};
use crate::scheduler::{session_from_task, task_name, DurableScheduler, RecheckClient};
use crate::store::HoldStore;

/// Result of `start`.
#[derive(Clone, Debug, PartialEq)]
pub enum StartOutcome {
    Started(HoldRecord),
    /// No durable scheduling on this platform; nothing was stored. Use the
    /// fallback timer.
    Unsupported,
}

/// Result of `start_or_fallback`.
#[derive(Debug)]
pub enum HoldHandle {
    Durable(HoldRecord),
    Fallback(FallbackHandle),
}

/// What a single wake-up did.
#[derive(Clone, Debug, PartialEq)]
pub enum WakeOutcome {
    /// No record: already stopped or cleaned up.
    NoHold,
    /// Record already terminal; nothing to do.
    Terminal(HoldStatus),
    /// Hold still running.
    NoData { remaining_ms: i64 },
    /// Another wake-up holds the completion claim.
    InFlight,
    /// Recheck succeeded; hold marked complete and wake-ups unregistered.
    Completed,
    /// Recheck succeeded but the record was stopped, restarted or re-claimed
    /// meanwhile; nothing was written.
    Superseded,
    /// Recheck failed; the hold stays active and a later wake-up retries.
    RecheckFailed { attempts: u32, error: RemoteCallError },
    /// Recheck failed for the last allowed time; hold marked `error`.
    Abandoned { attempts: u32, error: RemoteCallError },
}

impl WakeOutcome {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            WakeOutcome::RecheckFailed { .. } | WakeOutcome::Abandoned { .. }
        )
    }
}

/// Read-only status lookup result.
#[derive(Clone, Debug, PartialEq)]
pub enum HoldStatusView {
    None,
    Present(HoldRecord),
    /// The store itself failed; says nothing about whether a hold exists.
    Unreadable(StorageError),
}

impl HoldStatusView {
    pub fn label(&self) -> &'static str {
        match self {
            HoldStatusView::None => "none",
            HoldStatusView::Present(r) => r.status.as_str(),
            HoldStatusView::Unreadable(_) => "error",
        }
    }
}

enum Decision {
    Absent,
    Terminal(HoldStatus),
    NotDue(i64),
    InFlight,
    Claimed,
}

pub struct HoldSupervisor<S, D, R, C = SystemClock> {
    store: S,
    scheduler: D,
    remote: R,
    clock: C,
    cfg: SupervisorCfg,
}

impl<S, D, R> HoldSupervisor<S, D, R, SystemClock>
where
    S: HoldStore,
    D: DurableScheduler,
    R: RecheckClient,
{
    pub fn new(store: S, scheduler: D, remote: R, cfg: SupervisorCfg) -> Self {
        Self::with_clock(store, scheduler, remote, SystemClock, cfg)
    }
}

impl<S, D, R, C> HoldSupervisor<S, D, R, C>
where
    S: HoldStore,
    D: DurableScheduler,
    R: RecheckClient,
    C: Clock,
{
    pub fn with_clock(store: S, scheduler: D, remote: R, clock: C, cfg: SupervisorCfg) -> Self {
        Self {
            store,
            scheduler,
            remote,
            clock,
            cfg,
        }
    }

    pub fn cfg(&self) -> &SupervisorCfg {
        &self.cfg
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Begin a hold of `duration_secs` for `session_id`.
    ///
    /// Any prior record for the session is cleared first (last writer wins).
    pub fn start(&self, session_id: &str, duration_secs: u64) -> Result<StartOutcome, HoldError> {
        if session_id.is_empty() {
            return Err(ValidationError::EmptySessionId.into());
        }
        if !self.scheduler.is_available() {
            tracing::info!(session_id = %session_id, "durable scheduling unavailable");
            return Ok(StartOutcome::Unsupported);
        }

        let task = task_name(session_id);
        if self.store.get(session_id)?.is_some() {
            tracing::debug!(session_id = %session_id, "replacing existing hold");
            self.unregister_quietly(session_id, &task);
            self.store.remove(session_id)?;
        }

        let mut record = HoldRecord::new(session_id, self.clock.now(), duration_secs);
        self.store.put(&record)?;

        if let Err(e) = self.scheduler.register(&task, self.cfg.poll_interval()) {
            self.store.remove(session_id)?;
            return Err(e.into());
        }

        record.status = HoldStatus::Active;
        self.store.put(&record)?;

        tracing::info!(
            session_id = %session_id,
            duration_secs,
            interval_secs = self.cfg.poll_interval().as_secs(),
            "hold started"
        );
        Ok(StartOutcome::Started(record))
    }

    /// Start a durable hold, or arm the fallback timer with `on_elapsed` when
    /// the platform has no durable scheduling.
    pub fn start_or_fallback<F>(
        &self,
        session_id: &str,
        duration_secs: u64,
        on_elapsed: F,
    ) -> Result<HoldHandle, HoldError>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.start(session_id, duration_secs)? {
            StartOutcome::Started(rec) => Ok(HoldHandle::Durable(rec)),
            StartOutcome::Unsupported => {
                let delay = std::time::Duration::from_secs(duration_secs);
                FallbackTimer::after(delay, on_elapsed)
                    .map(HoldHandle::Fallback)
                    .map_err(|e| HoldError::Fallback {
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// Route a scheduler callback by task name.
    pub fn handle_task(&self, task: &str) -> Result<WakeOutcome, HoldError> {
        let session_id =
            session_from_task(task).ok_or_else(|| HoldError::UnknownTask(task.to_string()))?;
        self.wake(session_id)
    }

    /// Wake every stored hold, in session-id order.
    pub fn wake_all(&self) -> Result<Vec<(String, Result<WakeOutcome, HoldError>)>, HoldError> {
        let ids = self.store.session_ids()?;
        Ok(ids
            .into_iter()
            .map(|id| {
                let res = self.wake(&id);
                (id, res)
            })
            .collect())
    }

    /// One periodic wake-up for `session_id`.
    pub fn wake(&self, session_id: &str) -> Result<WakeOutcome, HoldError> {
        let now = self.clock.now();
        let lease = self.cfg.claim_lease();
        let mut decision = Decision::Absent;

        self.store.update(session_id, &mut |rec: &mut HoldRecord| {
            if rec.status.is_terminal() {
                decision = Decision::Terminal(rec.status);
                return false;
            }
            // A pending record that receives a wake-up was registered by a
            // start that did not get to flip it.
            let promoted = rec.status == HoldStatus::Pending;
            rec.status = HoldStatus::Active;

            if !rec.is_due(now) {
                decision = Decision::NotDue(rec.remaining_ms(now));
                return promoted;
            }
            if let Some(claimed) = rec.claimed_at {
                if now - claimed < lease {
                    decision = Decision::InFlight;
                    return promoted;
                }
                tracing::warn!(session_id = %rec.session_id, %claimed, "taking over stale completion claim");
            }
            rec.claimed_at = Some(now);
            decision = Decision::Claimed;
            true
        })?;

        match decision {
            Decision::Absent => Ok(WakeOutcome::NoHold),
            Decision::Terminal(status) => Ok(WakeOutcome::Terminal(status)),
            Decision::NotDue(remaining_ms) => {
                tracing::debug!(session_id = %session_id, remaining_ms, "hold not yet elapsed");
                Ok(WakeOutcome::NoData { remaining_ms })
            }
            Decision::InFlight => Ok(WakeOutcome::InFlight),
            Decision::Claimed => self.complete(session_id, now),
        }
    }

    fn complete(&self, session_id: &str, claimed_at: DateTime<Utc>) -> Result<WakeOutcome, HoldError> {
        let task = task_name(session_id);

        match self.remote.recheck(session_id) {
            Ok(()) => {
                let done_at = self.clock.now();
                let written = self.store.update(session_id, &mut |rec: &mut HoldRecord| {
                    if rec.claimed_at != Some(claimed_at) {
                        return false;
                    }
                    rec.status = HoldStatus::Complete;
                    rec.completed_at = Some(done_at);
                    rec.claimed_at = None;
                    rec.last_error = None;
                    true
                })?;
                if !written {
                    tracing::debug!(session_id = %session_id, "hold changed during recheck");
                    return Ok(WakeOutcome::Superseded);
                }
                self.unregister_quietly(session_id, &task);
                tracing::info!(session_id = %session_id, "hold complete");
                Ok(WakeOutcome::Completed)
            }
            Err(error) => {
                let max = self.cfg.max_recheck_attempts;
                let mut attempts = 0;
                let mut gave_up = false;
                self.store.update(session_id, &mut |rec: &mut HoldRecord| {
                    if rec.claimed_at != Some(claimed_at) {
                        // Claim was taken over or the hold restarted.
                        attempts = rec.attempts;
                        return false;
                    }
                    rec.claimed_at = None;
                    rec.attempts = rec.attempts.saturating_add(1);
                    rec.last_error = Some(error.to_string());
                    attempts = rec.attempts;
                    if max.is_some_and(|m| rec.attempts >= m) {
                        rec.status = HoldStatus::Error;
                        gave_up = true;
                    }
                    true
                })?;

                if gave_up {
                    self.unregister_quietly(session_id, &task);
                    tracing::warn!(session_id = %session_id, attempts, error = %error, "recheck abandoned");
                    Ok(WakeOutcome::Abandoned { attempts, error })
                } else {
                    tracing::warn!(session_id = %session_id, attempts, error = %error, "recheck failed, will retry");
                    Ok(WakeOutcome::RecheckFailed { attempts, error })
                }
            }
        }
    }

    /// Drop the record, then cancel wake-ups. Safe when nothing is active.
    /// If the record cannot be removed the task stays registered so later
    /// wake-ups still reach it.
    pub fn stop(&self, session_id: &str) -> Result<(), HoldError> {
        self.store.remove(session_id)?;
        self.unregister_quietly(session_id, &task_name(session_id));
        tracing::info!(session_id = %session_id, "hold stopped");
        Ok(())
    }

    pub fn status(&self, session_id: &str) -> HoldStatusView {
        match self.store.get(session_id) {
            Ok(Some(rec)) => HoldStatusView::Present(rec),
            Ok(None) => HoldStatusView::None,
            Err(e) => HoldStatusView::Unreadable(e),
        }
    }

    fn unregister_quietly(&self, session_id: &str, task: &str) {
        if let Err(e) = self.scheduler.unregister(task) {
            tracing::warn!(session_id = %session_id, error = %e, "failed to unregister hold task");
        }
    }
}

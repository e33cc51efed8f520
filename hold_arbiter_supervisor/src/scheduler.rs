//! Seams to the host platform: durable periodic wake-ups and the remote recheck.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{RemoteCallError, SchedulerError};

/// Stable prefix for durable task names. The scheduler re-invokes a task by
/// name after a restart; the session id is recovered from the name alone.
pub const HOLD_TASK_PREFIX: &str = "hold.recheck:";

pub fn task_name(session_id: &str) -> String {
    format!("{HOLD_TASK_PREFIX}{session_id}")
}

pub fn session_from_task(task: &str) -> Option<&str> {
    task.strip_prefix(HOLD_TASK_PREFIX).filter(|s| !s.is_empty())
}

/// Platform facility that can re-invoke a named task after process suspension.
pub trait DurableScheduler: Send + Sync {
    fn is_available(&self) -> bool;
    fn register(&self, task: &str, interval: Duration) -> Result<(), SchedulerError>;
    /// Unregistering an unknown task must succeed.
    fn unregister(&self, task: &str) -> Result<(), SchedulerError>;
}

/// Scheduler for platforms without durable execution; callers fall back to
/// the in-process timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDurableScheduler;

impl DurableScheduler for NoDurableScheduler {
    fn is_available(&self) -> bool {
        false
    }

    fn register(&self, task: &str, _interval: Duration) -> Result<(), SchedulerError> {
        Err(SchedulerError::Rejected {
            task: task.to_string(),
            reason: "durable scheduling unavailable".to_string(),
        })
    }

    fn unregister(&self, _task: &str) -> Result<(), SchedulerError> {
        Ok(())
    }
}

/// Remote "hold elapsed" notification. Expected to be idempotent remotely:
/// a failed completion is retried in full on a later wake-up.
pub trait RecheckClient: Send + Sync {
    fn recheck(&self, session_id: &str) -> Result<(), RemoteCallError>;
}

impl<T: DurableScheduler + ?Sized> DurableScheduler for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }
    fn register(&self, task: &str, interval: Duration) -> Result<(), SchedulerError> {
        (**self).register(task, interval)
    }
    fn unregister(&self, task: &str) -> Result<(), SchedulerError> {
        (**self).unregister(task)
    }
}

impl<T: RecheckClient + ?Sized> RecheckClient for Arc<T> {
    fn recheck(&self, session_id: &str) -> Result<(), RemoteCallError> {
        (**self).recheck(session_id)
    }
}

//! hold_arbiter_supervisor
//!
//! Outside-world facing layer around `hold_arbiter_core`.
//!
//! Responsibilities:
//! - persist in-flight holds (`HoldStore`, `KvHoldStore`)
//! - drive holds to a single remote recheck across restarts (`HoldSupervisor`)
//! - degrade to an in-process timer where durable scheduling is missing
//! - map adjudication wire requests onto the core
//!
//! Non-goals:
//! - no async runtime
//! - no network transport (remote calls are host-supplied traits)
//! - no adjudication policy (lives in core)

pub mod adapter;
pub mod cfg;
pub mod clock;
pub mod error;
pub mod fallback;
pub mod kv;
pub mod record;
pub mod scheduler;
pub mod store;
pub mod supervisor;

pub use adapter::{submit_adjudication, AdjudicationClient, AdjudicationRequest, LocalAdjudicator};
pub use cfg::SupervisorCfg;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AdjudicationError, HoldError, RemoteCallError, SchedulerError, StorageError};
pub use fallback::{FallbackHandle, FallbackTimer};
pub use kv::{FileKvStore, KeyValueStore, KvHoldStore, MemoryKvStore};
pub use record::{HoldRecord, HoldStatus};
pub use scheduler::{
    session_from_task, task_name, DurableScheduler, NoDurableScheduler, RecheckClient,
    HOLD_TASK_PREFIX,
};
pub use store::{HoldStore, MemoryHoldStore};
pub use supervisor::{HoldHandle, HoldStatusView, HoldSupervisor, StartOutcome, WakeOutcome};

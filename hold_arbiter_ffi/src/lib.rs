#![allow(clippy::missing_safety_doc)]

use std::ffi::c_void;
use std::ptr;
use std::time::Duration;

use hold_arbiter_core::default_prompt_set;
use hold_arbiter_supervisor::{
    AdjudicationRequest, DurableScheduler, FallbackHandle, FallbackTimer, FileKvStore, HoldError,
    HoldStatus, HoldStatusView, HoldSupervisor, KvHoldStore, LocalAdjudicator, RecheckClient,
    RemoteCallError, SchedulerError, StartOutcome, SupervisorCfg, WakeOutcome,
};

/// FFI ABI version for hold_arbiter_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const HOLD_ARBITER_FFI_VERSION: u32 = 1;

pub const HA_OK: i32 = 0;
/// Durable scheduling unavailable; arm `hold_fallback_after` instead.
pub const HA_UNSUPPORTED: i32 = 1;
pub const HA_ERR_NULL: i32 = -1;
pub const HA_ERR_UTF8: i32 = -2;
pub const HA_ERR_JSON: i32 = -3;
pub const HA_ERR_VALIDATION: i32 = -4;
pub const HA_ERR_STORAGE: i32 = -5;
pub const HA_ERR_SCHEDULER: i32 = -6;
pub const HA_ERR_REMOTE: i32 = -7;
pub const HA_ERR_UNKNOWN_TASK: i32 = -8;
pub const HA_ERR_TIMER: i32 = -9;

const DEFAULT_LOG_FILTER: &str = "hold_arbiter_core=info,hold_arbiter_supervisor=info";
const VERBOSE_LOG_FILTER: &str = "hold_arbiter_core=debug,hold_arbiter_supervisor=debug";

#[no_mangle]
pub extern "C" fn hold_arbiter_ffi_version() -> u32 {
    HOLD_ARBITER_FFI_VERSION
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HaStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl HaStr {
    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }
}

/// Owned byte buffer. Free with `hold_arbiter_bytes_free`.
#[repr(C)]
pub struct HaBytes {
    pub ptr: *mut u8,
    pub len: usize,
}

impl HaBytes {
    fn null() -> Self {
        HaBytes { ptr: ptr::null_mut(), len: 0 }
    }

    fn from_vec(buf: Vec<u8>) -> Self {
        let mut boxed = buf.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);
        HaBytes { ptr, len }
    }
}

/// Return code plus an owned payload (JSON on success, error text otherwise).
#[repr(C)]
pub struct HaResult {
    pub rc: i32,
    pub bytes: HaBytes,
}

impl HaResult {
    fn err(rc: i32, msg: impl std::fmt::Display) -> Self {
        HaResult { rc, bytes: HaBytes::from_vec(msg.to_string().into_bytes()) }
    }
}

#[no_mangle]
pub unsafe extern "C" fn hold_arbiter_bytes_free(b: HaBytes) {
    if !b.ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(b.ptr, b.len);
        drop(Box::from_raw(slice_ptr));
    }
}

/// Install a stderr `tracing` subscriber. `RUST_LOG` overrides the filter.
/// Returns 0 when installed, 1 if a global subscriber already exists.
#[no_mangle]
pub extern "C" fn hold_arbiter_init_logging(verbose: u8) -> i32 {
    let default = if verbose != 0 { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => HA_OK,
        Err(_) => 1,
    }
}

// ---------------------------------------------------------------------
// Adjudication
// ---------------------------------------------------------------------

/// Prompt-set query: `{"instructions": ..., "prompts": [...]}`.
#[no_mangle]
pub extern "C" fn hold_arbiter_prompt_set_json() -> HaBytes {
    match serde_json::to_vec(&default_prompt_set()) {
        Ok(buf) => HaBytes::from_vec(buf),
        Err(_) => HaBytes::null(),
    }
}

/// Adjudicate a JSON `AdjudicationRequest` against the default prompt set.
/// On success `bytes` holds the JSON classification.
#[no_mangle]
pub extern "C" fn hold_arbiter_adjudicate_json(request: HaStr) -> HaResult {
    let Some(text) = request.as_str() else {
        return HaResult::err(HA_ERR_UTF8, "request is null or not UTF-8");
    };
    let req: AdjudicationRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => return HaResult::err(HA_ERR_JSON, e),
    };
    let classification = match LocalAdjudicator::default().answer(&req) {
        Ok(c) => c,
        Err(e) => return HaResult::err(HA_ERR_VALIDATION, e),
    };
    match serde_json::to_vec(&classification) {
        Ok(buf) => HaResult { rc: HA_OK, bytes: HaBytes::from_vec(buf) },
        Err(e) => HaResult::err(HA_ERR_JSON, e),
    }
}

// ---------------------------------------------------------------------
// Host bridge
// ---------------------------------------------------------------------

/// Callbacks into the host platform. Any callback may be null.
///
/// The host guarantees `user_data` stays valid for the supervisor's lifetime
/// and that the callbacks are safe to call from any thread.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HaHost {
    pub user_data: *mut c_void,
    /// Non-zero if the platform can re-invoke a named task after suspension.
    pub durable_available: u8,
    /// Register periodic task `name` every `interval_secs`. Return 0 on success.
    pub register: Option<unsafe extern "C" fn(*mut c_void, HaStr, u64) -> i32>,
    /// Unregister task `name`. Return 0 on success.
    pub unregister: Option<unsafe extern "C" fn(*mut c_void, HaStr) -> i32>,
    /// Remote recheck for `session_id`. Return 0 on success.
    pub recheck: Option<unsafe extern "C" fn(*mut c_void, HaStr) -> i32>,
}

fn str_view(s: &str) -> HaStr {
    HaStr { ptr: s.as_ptr(), len: s.len() }
}

#[derive(Clone, Copy)]
struct HostBridge(HaHost);

// The host contract above makes the raw user_data pointer shareable.
unsafe impl Send for HostBridge {}
unsafe impl Sync for HostBridge {}

impl DurableScheduler for HostBridge {
    fn is_available(&self) -> bool {
        self.0.durable_available != 0 && self.0.register.is_some()
    }

    fn register(&self, task: &str, interval: Duration) -> Result<(), SchedulerError> {
        let Some(cb) = self.0.register else {
            return Err(SchedulerError::Rejected {
                task: task.to_string(),
                reason: "no register callback".to_string(),
            });
        };
        let rc = unsafe { cb(self.0.user_data, str_view(task), interval.as_secs()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(SchedulerError::Rejected {
                task: task.to_string(),
                reason: format!("host returned {rc}"),
            })
        }
    }

    fn unregister(&self, task: &str) -> Result<(), SchedulerError> {
        let Some(cb) = self.0.unregister else {
            return Ok(());
        };
        let rc = unsafe { cb(self.0.user_data, str_view(task)) };
        if rc == 0 {
            Ok(())
        } else {
            Err(SchedulerError::Rejected {
                task: task.to_string(),
                reason: format!("host returned {rc}"),
            })
        }
    }
}

impl RecheckClient for HostBridge {
    fn recheck(&self, session_id: &str) -> Result<(), RemoteCallError> {
        let Some(cb) = self.0.recheck else {
            return Err(RemoteCallError::Unreachable);
        };
        match unsafe { cb(self.0.user_data, str_view(session_id)) } {
            0 => Ok(()),
            code => Err(RemoteCallError::Rejected { code }),
        }
    }
}

// ---------------------------------------------------------------------
// Hold supervisor
// ---------------------------------------------------------------------

/// Opaque handle exposed over FFI.
pub struct HaHoldSupervisor {
    inner: HoldSupervisor<KvHoldStore<FileKvStore>, HostBridge, HostBridge>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaWakeOutcome {
    NoHold = 0,
    Terminal = 1,
    NoData = 2,
    InFlight = 3,
    Completed = 4,
    Superseded = 5,
    RecheckFailed = 6,
    Abandoned = 7,
}

#[repr(C)]
pub struct HaWakeResult {
    /// `HA_OK`, or an error code when the wake-up itself failed.
    pub rc: i32,
    pub outcome: HaWakeOutcome,
    pub remaining_ms: i64,
    pub attempts: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaHoldStatus {
    None = 0,
    Pending = 1,
    Active = 2,
    Complete = 3,
    Error = 4,
    /// Store unreadable; not the same as `None`.
    Unreadable = 5,
}

#[repr(C)]
pub struct HaStatusResult {
    pub status: HaHoldStatus,
    pub start_unix_ms: i64,
    pub duration_secs: u64,
    pub attempts: u32,
}

fn hold_error_rc(e: &HoldError) -> i32 {
    match e {
        HoldError::Validation(_) => HA_ERR_VALIDATION,
        HoldError::Storage(_) => HA_ERR_STORAGE,
        HoldError::Scheduler(_) => HA_ERR_SCHEDULER,
        HoldError::UnknownTask(_) => HA_ERR_UNKNOWN_TASK,
        HoldError::Fallback { .. } => HA_ERR_TIMER,
    }
}

fn status_to_ffi(s: HoldStatus) -> HaHoldStatus {
    match s {
        HoldStatus::Pending => HaHoldStatus::Pending,
        HoldStatus::Active => HaHoldStatus::Active,
        HoldStatus::Complete => HaHoldStatus::Complete,
        HoldStatus::Error => HaHoldStatus::Error,
    }
}

fn wake_to_ffi(res: Result<WakeOutcome, HoldError>) -> HaWakeResult {
    let mut out = HaWakeResult::error(HA_OK);
    match res {
        Ok(WakeOutcome::NoHold) => {}
        Ok(WakeOutcome::Terminal(_)) => out.outcome = HaWakeOutcome::Terminal,
        Ok(WakeOutcome::NoData { remaining_ms }) => {
            out.outcome = HaWakeOutcome::NoData;
            out.remaining_ms = remaining_ms;
        }
        Ok(WakeOutcome::InFlight) => out.outcome = HaWakeOutcome::InFlight,
        Ok(WakeOutcome::Completed) => out.outcome = HaWakeOutcome::Completed,
        Ok(WakeOutcome::Superseded) => out.outcome = HaWakeOutcome::Superseded,
        Ok(WakeOutcome::RecheckFailed { attempts, .. }) => {
            out.rc = HA_ERR_REMOTE;
            out.outcome = HaWakeOutcome::RecheckFailed;
            out.attempts = attempts;
        }
        Ok(WakeOutcome::Abandoned { attempts, .. }) => {
            out.rc = HA_ERR_REMOTE;
            out.outcome = HaWakeOutcome::Abandoned;
            out.attempts = attempts;
        }
        Err(e) => out.rc = hold_error_rc(&e),
    }
    out
}

/// Create a supervisor persisting holds as JSON at `store_path`.
///
/// `cfg_json` may be null or empty for defaults. Returns null on failure.
#[no_mangle]
pub extern "C" fn hold_supervisor_new(
    store_path: HaStr,
    cfg_json: HaStr,
    host: HaHost,
) -> *mut HaHoldSupervisor {
    let Some(path) = store_path.as_str() else {
        return ptr::null_mut();
    };
    let cfg = match SupervisorCfg::from_json(cfg_json.as_str().unwrap_or("")) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "invalid supervisor cfg");
            return ptr::null_mut();
        }
    };
    let kv = match FileKvStore::open(path) {
        Ok(kv) => kv,
        Err(e) => {
            tracing::warn!(path, error = %e, "failed to open hold store");
            return ptr::null_mut();
        }
    };
    let bridge = HostBridge(host);
    let handle = HaHoldSupervisor {
        inner: HoldSupervisor::new(KvHoldStore::new(kv), bridge, bridge, cfg),
    };
    Box::into_raw(Box::new(handle))
}

#[no_mangle]
pub unsafe extern "C" fn hold_supervisor_free(h: *mut HaHoldSupervisor) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

/// Start a hold. Returns `HA_OK`, `HA_UNSUPPORTED`, or a negative error code.
#[no_mangle]
pub unsafe extern "C" fn hold_start(h: *mut HaHoldSupervisor, session_id: HaStr, duration_secs: u64) -> i32 {
    if h.is_null() {
        return HA_ERR_NULL;
    }
    let Some(sid) = session_id.as_str() else {
        return HA_ERR_UTF8;
    };
    match (*h).inner.start(sid, duration_secs) {
        Ok(StartOutcome::Started(_)) => HA_OK,
        Ok(StartOutcome::Unsupported) => HA_UNSUPPORTED,
        Err(e) => hold_error_rc(&e),
    }
}

/// Entry point for the host's durable task handler, keyed by task name.
#[no_mangle]
pub unsafe extern "C" fn hold_wake(h: *mut HaHoldSupervisor, task: HaStr) -> HaWakeResult {
    if h.is_null() {
        return HaWakeResult::error(HA_ERR_NULL);
    }
    let Some(name) = task.as_str() else {
        return HaWakeResult::error(HA_ERR_UTF8);
    };
    wake_to_ffi((*h).inner.handle_task(name))
}

/// Wake one session directly.
#[no_mangle]
pub unsafe extern "C" fn hold_wake_session(h: *mut HaHoldSupervisor, session_id: HaStr) -> HaWakeResult {
    if h.is_null() {
        return HaWakeResult::error(HA_ERR_NULL);
    }
    let Some(sid) = session_id.as_str() else {
        return HaWakeResult::error(HA_ERR_UTF8);
    };
    wake_to_ffi((*h).inner.wake(sid))
}

impl HaWakeResult {
    fn error(rc: i32) -> Self {
        HaWakeResult {
            rc,
            outcome: HaWakeOutcome::NoHold,
            remaining_ms: 0,
            attempts: 0,
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn hold_stop(h: *mut HaHoldSupervisor, session_id: HaStr) -> i32 {
    if h.is_null() {
        return HA_ERR_NULL;
    }
    let Some(sid) = session_id.as_str() else {
        return HA_ERR_UTF8;
    };
    match (*h).inner.stop(sid) {
        Ok(()) => HA_OK,
        Err(e) => hold_error_rc(&e),
    }
}

#[no_mangle]
pub unsafe extern "C" fn hold_status(h: *mut HaHoldSupervisor, session_id: HaStr) -> HaStatusResult {
    let mut out = HaStatusResult {
        status: HaHoldStatus::Unreadable,
        start_unix_ms: 0,
        duration_secs: 0,
        attempts: 0,
    };
    if h.is_null() {
        return out;
    }
    let Some(sid) = session_id.as_str() else {
        return out;
    };
    match (*h).inner.status(sid) {
        HoldStatusView::None => out.status = HaHoldStatus::None,
        HoldStatusView::Present(rec) => {
            out.status = status_to_ffi(rec.status);
            out.start_unix_ms = rec.start_time.timestamp_millis();
            out.duration_secs = rec.duration_secs;
            out.attempts = rec.attempts;
        }
        HoldStatusView::Unreadable(_) => {}
    }
    out
}

/// Validation helper for hosts that assemble requests themselves.
/// Returns `HA_OK` or `HA_ERR_VALIDATION` / `HA_ERR_JSON`.
#[no_mangle]
pub extern "C" fn hold_arbiter_validate_request_json(request: HaStr) -> i32 {
    let Some(text) = request.as_str() else {
        return HA_ERR_UTF8;
    };
    let req: AdjudicationRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return HA_ERR_JSON,
    };
    match req.validate(&default_prompt_set()) {
        Ok(()) => HA_OK,
        Err(_) => HA_ERR_VALIDATION,
    }
}

// ---------------------------------------------------------------------
// Fallback timer
// ---------------------------------------------------------------------

/// Opaque fallback timer handle.
pub struct HaFallback {
    inner: FallbackHandle,
}

struct SendPtr(*mut c_void);

// The host owns user_data and accepts the callback on the timer thread.
unsafe impl Send for SendPtr {}

impl SendPtr {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

/// Call `cb(user_data)` once after `delay_ms`, on a background thread.
/// Not durable. Returns null if `cb` is null or the timer could not start.
#[no_mangle]
pub extern "C" fn hold_fallback_after(
    delay_ms: u64,
    cb: Option<unsafe extern "C" fn(*mut c_void)>,
    user_data: *mut c_void,
) -> *mut HaFallback {
    let Some(cb) = cb else {
        return ptr::null_mut();
    };
    let data = SendPtr(user_data);
    match FallbackTimer::after(Duration::from_millis(delay_ms), move || unsafe { cb(data.get()) }) {
        Ok(inner) => Box::into_raw(Box::new(HaFallback { inner })),
        Err(e) => {
            tracing::warn!(error = %e, "failed to arm fallback timer");
            ptr::null_mut()
        }
    }
}

/// Returns 1 if cancelled before firing, 0 otherwise.
#[no_mangle]
pub unsafe extern "C" fn hold_fallback_cancel(t: *mut HaFallback) -> u8 {
    if t.is_null() {
        return 0;
    }
    (*t).inner.cancel() as u8
}

/// Block until the timer resolves, then free it. Returns 1 if the callback ran.
#[no_mangle]
pub unsafe extern "C" fn hold_fallback_join(t: *mut HaFallback) -> u8 {
    if t.is_null() {
        return 0;
    }
    Box::from_raw(t).inner.join() as u8
}

/// Free the handle without cancelling; an armed timer still fires.
#[no_mangle]
pub unsafe extern "C" fn hold_fallback_free(t: *mut HaFallback) {
    if !t.is_null() {
        drop(Box::from_raw(t));
    }
}

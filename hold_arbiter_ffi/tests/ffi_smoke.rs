//! FFI smoke tests.
//!
//! These tests call the exported `extern "C"` functions directly (as an external consumer would),
//! to validate:
//! - ABI surface compiles and links
//! - allocation/free symmetry for returned buffers
//! - a hold runs start -> wake -> complete through host callbacks

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use hold_arbiter_ffi::*;

fn s(s: &str) -> HaStr {
    HaStr {
        ptr: s.as_ptr(),
        len: s.len(),
    }
}

fn null_str() -> HaStr {
    HaStr { ptr: ptr::null(), len: 0 }
}

fn bytes_to_json(b: &HaBytes) -> serde_json::Value {
    let slice = unsafe { std::slice::from_raw_parts(b.ptr, b.len) };
    serde_json::from_slice(slice).unwrap()
}

#[derive(Default)]
struct HostCounters {
    registered: AtomicUsize,
    unregistered: AtomicUsize,
    rechecks: AtomicUsize,
    fired: AtomicUsize,
}

unsafe extern "C" fn on_register(ud: *mut c_void, _name: HaStr, interval_secs: u64) -> i32 {
    assert_eq!(interval_secs, 60);
    (*(ud as *const HostCounters)).registered.fetch_add(1, Ordering::SeqCst);
    0
}

unsafe extern "C" fn on_unregister(ud: *mut c_void, _name: HaStr) -> i32 {
    (*(ud as *const HostCounters)).unregistered.fetch_add(1, Ordering::SeqCst);
    0
}

unsafe extern "C" fn on_recheck(ud: *mut c_void, _session: HaStr) -> i32 {
    (*(ud as *const HostCounters)).rechecks.fetch_add(1, Ordering::SeqCst);
    0
}

unsafe extern "C" fn on_fire(ud: *mut c_void) {
    (*(ud as *const HostCounters)).fired.fetch_add(1, Ordering::SeqCst);
}

fn host(counters: &HostCounters, durable: bool) -> HaHost {
    HaHost {
        user_data: counters as *const HostCounters as *mut c_void,
        durable_available: durable as u8,
        register: Some(on_register),
        unregister: Some(on_unregister),
        recheck: Some(on_recheck),
    }
}

#[test]
fn ffi_version_and_logging() {
    assert_eq!(hold_arbiter_ffi_version(), HOLD_ARBITER_FFI_VERSION);
    let first = hold_arbiter_init_logging(0);
    assert!(first == HA_OK || first == 1);
    assert_eq!(hold_arbiter_init_logging(0), 1);
}

#[test]
fn ffi_prompt_set_and_free() {
    let b = hold_arbiter_prompt_set_json();
    assert!(!b.ptr.is_null());
    let v = bytes_to_json(&b);
    assert_eq!(v["prompts"].as_array().unwrap().len(), 3);
    assert!(v["instructions"].as_str().unwrap().len() > 0);
    unsafe { hold_arbiter_bytes_free(b) };
}

#[test]
fn ffi_adjudicate_json() {
    let req = r#"{"session_id":"s1","patch_id":"p1","archive_as_latent":false,"responses":[
        {"question":"q0","answer":"clearer","confidence":0.9},
        {"question":"q1","answer":"tests","confidence":0.8},
        {"question":"q2","answer":"yes","confidence":0.9}]}"#;
    let res = hold_arbiter_adjudicate_json(s(req));
    assert_eq!(res.rc, HA_OK);
    let v = bytes_to_json(&res.bytes);
    assert_eq!(v["outcome"], "active");
    assert!((v["confidence_score"].as_f64().unwrap() - 0.87).abs() < 1e-9);
    unsafe { hold_arbiter_bytes_free(res.bytes) };

    let bad = r#"{"session_id":"s1","patch_id":"p1","responses":[
        {"question":"q0","answer":"a","confidence":1.5}]}"#;
    let res = hold_arbiter_adjudicate_json(s(bad));
    assert_eq!(res.rc, HA_ERR_VALIDATION);
    unsafe { hold_arbiter_bytes_free(res.bytes) };

    assert_eq!(hold_arbiter_validate_request_json(s(bad)), HA_ERR_VALIDATION);
    assert_eq!(hold_arbiter_validate_request_json(s("{")), HA_ERR_JSON);

    let res = hold_arbiter_adjudicate_json(null_str());
    assert_eq!(res.rc, HA_ERR_UTF8);
    unsafe { hold_arbiter_bytes_free(res.bytes) };
}

#[test]
fn ffi_hold_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holds.json");
    let path = path.to_str().unwrap();
    let counters = HostCounters::default();

    let h = hold_supervisor_new(s(path), null_str(), host(&counters, true));
    assert!(!h.is_null());

    assert_eq!(unsafe { hold_start(h, s("s1"), 0) }, HA_OK);
    assert_eq!(counters.registered.load(Ordering::SeqCst), 1);

    let st = unsafe { hold_status(h, s("s1")) };
    assert_eq!(st.status, HaHoldStatus::Active);
    assert_eq!(st.duration_secs, 0);

    let w = unsafe { hold_wake(h, s("hold.recheck:s1")) };
    assert_eq!(w.rc, HA_OK);
    assert_eq!(w.outcome, HaWakeOutcome::Completed);
    assert_eq!(counters.rechecks.load(Ordering::SeqCst), 1);

    let w = unsafe { hold_wake_session(h, s("s1")) };
    assert_eq!(w.outcome, HaWakeOutcome::Terminal);
    assert_eq!(counters.rechecks.load(Ordering::SeqCst), 1);

    let st = unsafe { hold_status(h, s("s1")) };
    assert_eq!(st.status, HaHoldStatus::Complete);

    assert_eq!(unsafe { hold_stop(h, s("s1")) }, HA_OK);
    let st = unsafe { hold_status(h, s("s1")) };
    assert_eq!(st.status, HaHoldStatus::None);

    let w = unsafe { hold_wake(h, s("bogus")) };
    assert_eq!(w.rc, HA_ERR_UNKNOWN_TASK);

    unsafe { hold_supervisor_free(h) };
}

#[test]
fn ffi_unsupported_falls_back_to_timer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holds.json");
    let counters = HostCounters::default();

    let h = hold_supervisor_new(s(path.to_str().unwrap()), s("{}"), host(&counters, false));
    assert!(!h.is_null());
    assert_eq!(unsafe { hold_start(h, s("s1"), 120) }, HA_UNSUPPORTED);
    assert_eq!(counters.registered.load(Ordering::SeqCst), 0);
    unsafe { hold_supervisor_free(h) };

    let ud = &counters as *const HostCounters as *mut c_void;
    let t = hold_fallback_after(0, Some(on_fire), ud);
    assert!(!t.is_null());
    assert_eq!(unsafe { hold_fallback_join(t) }, 1);
    assert_eq!(counters.fired.load(Ordering::SeqCst), 1);

    let t = hold_fallback_after(60_000, Some(on_fire), ud);
    assert_eq!(unsafe { hold_fallback_cancel(t) }, 1);
    assert_eq!(unsafe { hold_fallback_join(t) }, 0);
    assert_eq!(counters.fired.load(Ordering::SeqCst), 1);

    assert!(hold_fallback_after(0, None, ud).is_null());
}

#[test]
fn ffi_bad_cfg_returns_null() {
    let counters = HostCounters::default();
    let h = hold_supervisor_new(s("/tmp/unused.json"), s("not json"), host(&counters, true));
    assert!(h.is_null());
}

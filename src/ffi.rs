//! FFI bindings for Stride Planner
//!
//! This module provides C-compatible functions for calling the planner from a
//! host UI. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `stride_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::error::PlanError;
use crate::history::{record_sample, HistoricalLog};
use crate::interval::interval_label;
use crate::planner::compute_plan;
use crate::report::PlanEncoder;
use crate::session::PlannerSession;
use crate::store::MemoryStore;
use crate::types::PlanInput;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Report a result to the caller: the string on success, NULL plus last error otherwise
fn finish(result: Result<String, PlanError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<FixedOffset>, PlanError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| PlanError::TimeParseError(format!("invalid RFC 3339 instant '{raw}': {e}")))
}

/// Stateless planning request
#[derive(Deserialize)]
struct PlanRequest {
    #[serde(default)]
    input: PlanInput,
    #[serde(default)]
    history: Option<serde_json::Value>,
    now: String,
}

fn plan_from_request(request_json: &str) -> Result<String, PlanError> {
    let request: PlanRequest = serde_json::from_str(request_json)?;
    let now = parse_instant(&request.now)?;
    let history = request
        .history
        .map(|value| HistoricalLog::decode_value_lenient(value, now.date_naive()).log)
        .unwrap_or_default();
    let plan = compute_plan(&request.input, &history, now)?;
    PlanEncoder::new().encode_to_json(&plan, &request.input, now)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute a plan and return the JSON plan report.
///
/// The request is `{"input": {...}, "history": [...], "now": "<RFC 3339>"}`;
/// `input` and `history` may be omitted. `history` is the persisted log and is
/// decoded leniently: malformed entries and entries from other days are dropped.
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_compute_plan(request_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let request = match cstr_to_string(request_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid request string pointer");
            return ptr::null_mut();
        }
    };

    finish(plan_from_request(&request))
}

/// Append a sample to a persisted log and return the updated log JSON.
///
/// Malformed or stale entries in `log_json` are dropped.
///
/// # Safety
/// - `log_json` and `timestamp` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_record_sample(
    log_json: *const c_char,
    timestamp: *const c_char,
    steps: u32,
) -> *mut c_char {
    clear_last_error();

    let log_str = match cstr_to_string(log_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid log string pointer");
            return ptr::null_mut();
        }
    };

    let ts_str = match cstr_to_string(timestamp) {
        Some(s) => s,
        None => {
            set_last_error("Invalid timestamp string pointer");
            return ptr::null_mut();
        }
    };

    finish(parse_instant(&ts_str).and_then(|now| {
        let history = HistoricalLog::from_json_lenient(&log_str, now.date_naive());
        record_sample(&history, now, steps).to_json()
    }))
}

/// Display label for a checkpoint interval in minutes.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
#[no_mangle]
pub unsafe extern "C" fn stride_interval_label(minutes: u32) -> *mut c_char {
    clear_last_error();
    string_to_cstr(&interval_label(minutes))
}

// ============================================================================
// Stateful API
// ============================================================================

/// Opaque handle to a planner session backed by an in-memory log
pub struct StrideSessionHandle {
    session: PlannerSession<MemoryStore>,
}

/// Open a session from a persisted log (may be NULL for a fresh log).
///
/// # Safety
/// - `log_json` must be NULL or a valid null-terminated C string.
/// - `now` must be a valid null-terminated RFC 3339 string.
/// - Returns a pointer that must be freed with `stride_session_free`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_session_new(
    log_json: *const c_char,
    now: *const c_char,
) -> *mut StrideSessionHandle {
    clear_last_error();

    let now = match cstr_to_string(now).map(|s| parse_instant(&s)) {
        Some(Ok(now)) => now,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid now string pointer");
            return ptr::null_mut();
        }
    };

    let store = match cstr_to_string(log_json) {
        Some(raw) => MemoryStore::with_raw(raw),
        None => MemoryStore::new(),
    };

    match PlannerSession::open(store, now) {
        Ok(session) => Box::into_raw(Box::new(StrideSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session handle.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `stride_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stride_session_free(handle: *mut StrideSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Replace the session's plan inputs from JSON (missing fields take defaults).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `stride_session_new`.
/// - `input_json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn stride_session_set_input(
    handle: *mut StrideSessionHandle,
    input_json: *const c_char,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *handle;

    let input_str = match cstr_to_string(input_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid input string pointer");
            return -1;
        }
    };

    match serde_json::from_str::<PlanInput>(&input_str) {
        Ok(input) => {
            *handle.session.input_mut() = input;
            0
        }
        Err(e) => {
            set_last_error(&PlanError::from(e).to_string());
            -1
        }
    }
}

/// Record the session's current steps at `now`; returns the persisted log JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `stride_session_new`.
/// - `now` must be a valid null-terminated RFC 3339 string.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
#[no_mangle]
pub unsafe extern "C" fn stride_session_save_steps(
    handle: *mut StrideSessionHandle,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *handle;

    let now_str = match cstr_to_string(now) {
        Some(s) => s,
        None => {
            set_last_error("Invalid now string pointer");
            return ptr::null_mut();
        }
    };

    finish(parse_instant(&now_str).and_then(|now| {
        handle.session.save_current_steps(now)?;
        Ok(handle.session.store().raw().unwrap_or("[]").to_string())
    }))
}

/// Compute the session's plan at `now` and return the JSON plan report.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `stride_session_new`.
/// - `now` must be a valid null-terminated RFC 3339 string.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
#[no_mangle]
pub unsafe extern "C" fn stride_session_plan(
    handle: *const StrideSessionHandle,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;

    let now_str = match cstr_to_string(now) {
        Some(s) => s,
        None => {
            set_last_error("Invalid now string pointer");
            return ptr::null_mut();
        }
    };

    finish(parse_instant(&now_str).and_then(|now| {
        let plan = handle.session.plan(now)?;
        PlanEncoder::new().encode_to_json(&plan, handle.session.input(), now)
    }))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Stride functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Stride function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stride_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Stride function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn stride_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn stride_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        stride_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_compute_plan() {
        let request = CString::new(
            r#"{
                "input": {"target_steps": 8000, "target_time": "15:00", "walking_pace": 100,
                          "current_steps": 2000, "checkpoint_interval": 60},
                "history": [{"date": "2024-03-10", "time": "09:00", "steps": 800}],
                "now": "2024-03-10T12:00:00+00:00"
            }"#,
        )
        .unwrap();

        unsafe {
            let report = take_string(stride_compute_plan(request.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&report).unwrap();

            assert_eq!(report["status"], "on_track");
            assert_eq!(report["metrics"]["steps_per_hour"], 2000);
            assert_eq!(report["checkpoints"].as_array().unwrap().len(), 5);
            assert_eq!(report["checkpoints"][0]["kind"], "recorded");
        }
    }

    #[test]
    fn test_ffi_compute_plan_decodes_history_leniently() {
        let request = CString::new(
            r#"{
                "input": {"target_steps": 8000, "target_time": "15:00", "walking_pace": 100,
                          "current_steps": 2000, "checkpoint_interval": 60},
                "history": [
                    {"time": "09:00", "steps": 800},
                    {"date": "2024-03-09", "time": "13:30", "steps": 9900},
                    {"date": "2024-03-10", "time": "breakfast", "steps": 1}
                ],
                "now": "2024-03-10T12:00:00+00:00"
            }"#,
        )
        .unwrap();

        unsafe {
            let report = take_string(stride_compute_plan(request.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&report).unwrap();

            let checkpoints = report["checkpoints"].as_array().unwrap();
            let recorded: Vec<&serde_json::Value> = checkpoints
                .iter()
                .filter(|c| c["kind"] == "recorded")
                .collect();
            // Only the legacy 09:00 entry survives
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0]["steps"], 800);
            assert_eq!(recorded[0]["time"], "2024-03-10T09:00:00+00:00");
            assert!(checkpoints.iter().all(|c| c["steps"] != 9900));
            assert_eq!(checkpoints.len(), 5);
        }
    }

    #[test]
    fn test_ffi_record_sample() {
        let log = CString::new(r#"[{"date":"2024-03-09","time":"20:00","steps":9000}]"#).unwrap();
        let ts = CString::new("2024-03-10T08:30:15+00:00").unwrap();

        unsafe {
            let updated = take_string(stride_record_sample(log.as_ptr(), ts.as_ptr(), 450));
            assert_eq!(updated, r#"[{"date":"2024-03-10","time":"08:30","steps":450}]"#);
        }
    }

    #[test]
    fn test_ffi_interval_label() {
        unsafe {
            assert_eq!(take_string(stride_interval_label(120)), "2 hours");
            assert_eq!(take_string(stride_interval_label(45)), "45 minutes");
        }
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        let now = CString::new("2024-03-10T12:00:00+00:00").unwrap();
        let input = CString::new(r#"{"current_steps": 3000, "target_time": "16:00"}"#).unwrap();

        unsafe {
            let handle = stride_session_new(ptr::null(), now.as_ptr());
            assert!(!handle.is_null());

            assert_eq!(stride_session_set_input(handle, input.as_ptr()), 0);

            let log = take_string(stride_session_save_steps(handle, now.as_ptr()));
            assert!(log.contains(r#""steps":3000"#));

            let report = take_string(stride_session_plan(handle, now.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&report).unwrap();
            assert_eq!(report["target_steps"], 8000);
            assert_eq!(report["metrics"]["steps_per_hour"], 1250);

            stride_session_free(handle);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let request = CString::new("not json").unwrap();

        unsafe {
            let result = stride_compute_plan(request.as_ptr());
            assert!(result.is_null());

            let error = stride_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.starts_with("Invalid JSON"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = stride_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}

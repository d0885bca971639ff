//! FFI bindings for the attention monitor
//!
//! This module provides C-compatible functions for driving a monitor from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `attn_free_string`.
//!
//! Times cross the boundary as milliseconds since the Unix epoch (UTC).

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::config::MonitorConfig;
use crate::encoder::StatsEncoder;
use crate::error::ComputeError;
use crate::pipeline::{frames_to_stats, AttentionMonitor};
use crate::schema::FrameEventAdapter;
use crate::thresholds::{ThresholdKind, Thresholds};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, ComputeError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| ComputeError::ParseError(format!("timestamp {ms}ms is out of range")))
}

/// NULL config means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<MonitorConfig, ComputeError> {
    if config_json.is_null() {
        return Ok(MonitorConfig::default());
    }
    match cstr_to_string(config_json) {
        Some(json) => MonitorConfig::from_json(&json),
        None => Err(ComputeError::InvalidConfig(
            "config is not valid UTF-8".to_string(),
        )),
    }
}

/// Report a string result: the string on success, NULL plus last error otherwise
fn string_result(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Report a status result: 0 on success, -1 plus last error otherwise
fn status_result(result: Result<(), ComputeError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay NDJSON frame records and return `{"records": [...], "summary": {...}}`.
///
/// # Safety
/// - `ndjson` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `attn_free_string`.
/// - Returns NULL on error; call `attn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attn_frames_to_stats(
    ndjson: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let input = match cstr_to_string(ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid NDJSON string pointer");
            return ptr::null_mut();
        }
    };

    string_result(config_from_ptr(config_json).and_then(|config| {
        let output = frames_to_stats(&input, config)?;
        serde_json::to_string(&output).map_err(ComputeError::JsonError)
    }))
}

// ============================================================================
// Stateful Monitor API
// ============================================================================

/// Opaque handle to an AttentionMonitor
pub struct AttnMonitorHandle {
    monitor: AttentionMonitor,
    encoder: StatsEncoder,
}

impl AttnMonitorHandle {
    fn stats_json(&self, now: DateTime<Utc>) -> Result<String, ComputeError> {
        self.encoder.encode_stats_to_json(&self.monitor.stats(now))
    }
}

/// Create a monitor whose session starts at `start_ms`.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `attn_monitor_free`.
/// - Returns NULL on error; call `attn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_new(
    config_json: *const c_char,
    start_ms: i64,
) -> *mut AttnMonitorHandle {
    clear_last_error();

    let created = config_from_ptr(config_json).and_then(|config| {
        let now = millis_to_utc(start_ms)?;
        AttentionMonitor::new(config, now)
    });

    match created {
        Ok(monitor) => Box::into_raw(Box::new(AttnMonitorHandle {
            monitor,
            encoder: StatsEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a monitor.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_free(monitor: *mut AttnMonitorHandle) {
    if !monitor.is_null() {
        drop(Box::from_raw(monitor));
    }
}

/// Classify one attn.landmark_frame.v1 record.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns the stable state after the frame: 1 attentive, 0 distracted.
/// - Returns -1 on error; call `attn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_process_frame(
    monitor: *mut AttnMonitorHandle,
    frame_json: *const c_char,
) -> i32 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1;
    }

    let handle = &mut *monitor;

    let json = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return -1;
        }
    };

    let frame = match FrameEventAdapter::parse_line(&json, 1).and_then(|e| e.to_timed_frame()) {
        Ok(frame) => frame,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };

    i32::from(handle.monitor.process_frame(&frame).is_attentive())
}

/// Advance the session clock to `now_ms` and return the encoded stats record.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns a newly allocated string that must be freed with `attn_free_string`.
/// - Returns NULL on error; call `attn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_tick(
    monitor: *mut AttnMonitorHandle,
    now_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *monitor;

    string_result(millis_to_utc(now_ms).and_then(|now| {
        handle.monitor.tick(now);
        handle.stats_json(now)
    }))
}

/// Read the encoded stats record at `now_ms` without advancing the session.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns a newly allocated string that must be freed with `attn_free_string`.
/// - Returns NULL on error; call `attn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_stats(
    monitor: *const AttnMonitorHandle,
    now_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    }

    let handle = &*monitor;
    string_result(millis_to_utc(now_ms).and_then(|now| handle.stats_json(now)))
}

/// Read the encoded session summary at `now_ms`.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns a newly allocated string that must be freed with `attn_free_string`.
/// - Returns NULL on error; call `attn_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_summary(
    monitor: *const AttnMonitorHandle,
    now_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return ptr::null_mut();
    }

    let handle = &*monitor;
    string_result(millis_to_utc(now_ms).and_then(|now| {
        handle
            .encoder
            .encode_summary_to_json(&handle.monitor.summary(now))
    }))
}

/// Shared body of pause/resume/reset
unsafe fn with_monitor_at(
    monitor: *mut AttnMonitorHandle,
    now_ms: i64,
    action: impl FnOnce(&mut AttentionMonitor, DateTime<Utc>),
) -> i32 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1;
    }

    let handle = &mut *monitor;
    status_result(millis_to_utc(now_ms).map(|now| action(&mut handle.monitor, now)))
}

/// Pause the session at `now_ms`.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_pause(monitor: *mut AttnMonitorHandle, now_ms: i64) -> i32 {
    with_monitor_at(monitor, now_ms, |m, now| m.pause(now))
}

/// Resume the session at `now_ms`.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_resume(monitor: *mut AttnMonitorHandle, now_ms: i64) -> i32 {
    with_monitor_at(monitor, now_ms, |m, now| m.resume(now))
}

/// Zero the session statistics at `now_ms`; thresholds are kept.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_reset(monitor: *mut AttnMonitorHandle, now_ms: i64) -> i32 {
    with_monitor_at(monitor, now_ms, |m, now| m.reset(now))
}

/// Replace both thresholds.
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - Returns 0 on success, -1 on error (values outside (0, 1) are rejected).
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_set_thresholds(
    monitor: *mut AttnMonitorHandle,
    face: f64,
    eye: f64,
) -> i32 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1;
    }

    let handle = &*monitor;
    status_result(Thresholds::new(face, eye).and_then(|t| handle.monitor.set_thresholds(t)))
}

/// Step a threshold by `steps` increments of 0.01 within [0.1, 0.5].
///
/// # Safety
/// - `monitor` must be a valid pointer returned by `attn_monitor_new`.
/// - `kind` is 0 for the face threshold, 1 for the eye threshold.
/// - Returns the new value, or a negative number on error.
#[no_mangle]
pub unsafe extern "C" fn attn_monitor_nudge_threshold(
    monitor: *mut AttnMonitorHandle,
    kind: i32,
    steps: i32,
) -> f64 {
    clear_last_error();

    if monitor.is_null() {
        set_last_error("Null monitor pointer");
        return -1.0;
    }

    let kind = match kind {
        0 => ThresholdKind::Face,
        1 => ThresholdKind::Eye,
        other => {
            set_last_error(&format!("Unknown threshold kind {other}"));
            return -1.0;
        }
    };

    let handle = &*monitor;
    handle.monitor.nudge_threshold(kind, steps)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by attn functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an attn function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn attn_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next attn function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn attn_last_error() -> *const c_char {
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
pub unsafe extern "C" fn attn_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

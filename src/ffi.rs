//! FFI bindings for Motionsense
//!
//! This module provides C-compatible functions for calling the engine from
//! phone hosts (Kotlin/Swift). All functions exchange JSON strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `motionsense_free_string`.
//!
//! The host owns the model artifact and interpreter, so FFI engines run
//! without a classifier: `motionsense_engine_push` drives the filter and
//! window stages, `motionsense_engine_window` hands the assembled tensor to
//! the host, and `motionsense_engine_decode` turns the host's score vector
//! back into a result.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;

use crate::inference::decode;
use crate::pipeline::{ActivityEngine, EngineConfig};
use crate::types::Sample;

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

/// Per-sample outcome returned by `motionsense_engine_push`
#[derive(Serialize)]
struct PushOutcome {
    filtered: Sample,
    window_len: usize,
    window_full: bool,
}

// ============================================================================
// Stateless API
// ============================================================================

/// Decode a JSON array of classifier scores into a result JSON.
///
/// # Safety
/// - `scores_json` must be a valid null-terminated C string holding a JSON
///   array of numbers, one per activity label in training order.
/// - Returns a newly allocated string that must be freed with
///   `motionsense_free_string`.
/// - Returns NULL on error; call `motionsense_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn motionsense_decode_scores(scores_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(scores_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid scores string pointer");
            return ptr::null_mut();
        }
    };

    let scores: Vec<f32> = match serde_json::from_str(&json_str) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match decode(&scores).and_then(|result| {
        serde_json::to_string(&result).map_err(crate::error::EngineError::JsonError)
    }) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to an ActivityEngine
pub struct EngineHandle {
    engine: ActivityEngine,
}

/// Create a new engine with the specified window size.
///
/// The engine runs in host-driven mode: the filter and window stages
/// execute on push, and the host runs its own model over
/// `motionsense_engine_window`.
///
/// # Safety
/// - Returns a pointer to a newly allocated engine.
/// - Must be freed with `motionsense_engine_free`.
/// - Pass a non-positive `window_size` for the default (150).
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_new(window_size: i32) -> *mut EngineHandle {
    clear_last_error();

    let mut config = EngineConfig::default();
    if window_size > 0 {
        config.window_size = window_size as usize;
    }

    match ActivityEngine::without_classifier(config) {
        Ok(engine) => Box::into_raw(Box::new(EngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `motionsense_engine_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_free(engine: *mut EngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Push one raw accelerometer triple through the filter and window stages.
///
/// Returns JSON `{"filtered": {...}, "window_len": n, "window_full": bool}`.
/// Non-finite triples are rejected without touching engine state: the call
/// returns NULL and sets the last error, and the host keeps pushing
/// subsequent samples.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `motionsense_engine_new`.
/// - Returns a newly allocated string that must be freed with
///   `motionsense_free_string`.
/// - Returns NULL on error; call `motionsense_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_push(
    engine: *mut EngineHandle,
    x: f64,
    y: f64,
    z: f64,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let rejected_before = handle.engine.stats().samples_rejected;
    handle.engine.on_sample([x, y, z]);
    if handle.engine.stats().samples_rejected > rejected_before {
        set_last_error(&format!("Non-finite sample rejected: ({x}, {y}, {z})"));
        return ptr::null_mut();
    }

    let outcome = PushOutcome {
        filtered: handle.engine.filtered(),
        window_len: handle.engine.window_len(),
        window_full: handle.engine.is_warmed_up(),
    };

    match serde_json::to_string(&outcome) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the assembled classifier input once the window is full.
///
/// Returns JSON `{"data": [...], "frames": n}`: `frames * 3` floats in
/// time order, each frame laid out `[x, y, z]`, ready to feed a
/// `[1, n, 3]` float32 model input.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `motionsense_engine_new`.
/// - Returns a newly allocated string that must be freed with
///   `motionsense_free_string`.
/// - Returns NULL while the window is still warming up (with the last
///   error set), or on error.
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_window(engine: *mut EngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let tensor = match handle.engine.window_tensor() {
        Some(t) => t,
        None => {
            set_last_error("Window not yet full");
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&tensor) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Decode a JSON array of host-side classifier scores into a result JSON,
/// keeping the engine's session counters accurate.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `motionsense_engine_new`.
/// - `scores_json` must be a valid null-terminated C string holding a JSON
///   array of numbers.
/// - Returns a newly allocated string that must be freed with
///   `motionsense_free_string`.
/// - Returns NULL on error; call `motionsense_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_decode(
    engine: *mut EngineHandle,
    scores_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(scores_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid scores string pointer");
            return ptr::null_mut();
        }
    };

    let scores: Vec<f32> = match serde_json::from_str(&json_str) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match handle.engine.decode_scores(&scores).and_then(|result| {
        serde_json::to_string(&result).map_err(crate::error::EngineError::JsonError)
    }) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the engine's session counters as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `motionsense_engine_new`.
/// - Returns a newly allocated string that must be freed with
///   `motionsense_free_string`.
/// - Returns NULL on error; call `motionsense_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_stats(engine: *mut EngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    match serde_json::to_string(&handle.engine.stats()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Discard filter and window state for a host-driven session restart.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `motionsense_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn motionsense_engine_reset(engine: *mut EngineHandle) {
    if !engine.is_null() {
        (*engine).engine.reset();
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Motionsense functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Motionsense function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn motionsense_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Motionsense function call
///   on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn motionsense_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Motionsense library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn motionsense_version() -> *const c_char {
    // Use a static CString to avoid allocation
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_engine_lifecycle() {
        unsafe {
            let engine = motionsense_engine_new(3);
            assert!(!engine.is_null());

            // Warmup pushes
            for _ in 0..2 {
                let outcome = motionsense_engine_push(engine, 0.1, 0.2, 0.3);
                assert!(!outcome.is_null());
                let text = CStr::from_ptr(outcome).to_str().unwrap();
                assert!(text.contains("\"window_full\":false"));
                motionsense_free_string(outcome);
            }

            // Window not full yet
            let window = motionsense_engine_window(engine);
            assert!(window.is_null());

            let outcome = motionsense_engine_push(engine, 0.1, 0.2, 0.3);
            let text = CStr::from_ptr(outcome).to_str().unwrap();
            assert!(text.contains("\"window_full\":true"));
            motionsense_free_string(outcome);

            let window = motionsense_engine_window(engine);
            assert!(!window.is_null());
            let text = CStr::from_ptr(window).to_str().unwrap();
            assert!(text.contains("\"frames\":3"));
            motionsense_free_string(window);

            // Host-side scores come back for decoding
            let scores = CString::new("[0.1, 0.05, 0.05, 0.1, 0.7]").unwrap();
            let result = motionsense_engine_decode(engine, scores.as_ptr());
            assert!(!result.is_null());
            let text = CStr::from_ptr(result).to_str().unwrap();
            assert!(text.contains("\"label\":\"walking\""));
            motionsense_free_string(result);

            let stats = motionsense_engine_stats(engine);
            let text = CStr::from_ptr(stats).to_str().unwrap();
            assert!(text.contains("\"predictions\":1"));
            motionsense_free_string(stats);

            motionsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_rejects_non_finite_push() {
        unsafe {
            let engine = motionsense_engine_new(0);
            assert!(!engine.is_null());

            let outcome = motionsense_engine_push(engine, f64::NAN, 0.0, 0.0);
            assert!(outcome.is_null());

            let error = motionsense_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            // Engine keeps accepting valid samples afterwards
            let outcome = motionsense_engine_push(engine, 0.0, 0.0, 0.0);
            assert!(!outcome.is_null());
            motionsense_free_string(outcome);

            motionsense_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_stateless_decode() {
        unsafe {
            let scores = CString::new("[0.2, 0.2, 0.2, 0.2, 0.2]").unwrap();
            let result = motionsense_decode_scores(scores.as_ptr());
            assert!(!result.is_null());
            let text = CStr::from_ptr(result).to_str().unwrap();
            assert!(text.contains("\"label\":\"climbing_down\""));
            motionsense_free_string(result);
        }
    }

    #[test]
    fn test_ffi_decode_error_handling() {
        unsafe {
            let scores = CString::new("not json").unwrap();
            let result = motionsense_decode_scores(scores.as_ptr());
            assert!(result.is_null());

            let error = motionsense_last_error();
            assert!(!error.is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = motionsense_version();
            assert!(!version.is_null());
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}

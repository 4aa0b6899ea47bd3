//! FFI bindings for Lactate Zones
//!
//! This module provides C-compatible functions for calling the engine from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `lactate_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{calculate, ThresholdEngine};
use crate::schema::StepTableAdapter;
use crate::types::ProtocolMode;

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

/// Hand a result to C, recording the error on failure
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn bundle_json(rows_json: &str, mode: &str) -> Result<String, ComputeError> {
    let mode: ProtocolMode = mode.parse().map_err(ComputeError::ParseError)?;
    let rows = StepTableAdapter::parse_array(rows_json)?;
    let bundle = calculate(&rows, mode)?;
    serde_json::to_string(&bundle).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Calculate a result bundle from a JSON array of step rows.
///
/// `mode` is one of `"hr"`, `"speed"` or `"sr"`.
///
/// # Safety
/// - `json` and `mode` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `lactate_free_string`.
/// - Returns NULL on error; call `lactate_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lactate_calculate(
    json: *const c_char,
    mode: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let mode_str = match cstr_to_string(mode) {
        Some(s) => s,
        None => {
            set_last_error("Invalid mode string pointer");
            return ptr::null_mut();
        }
    };

    finish(bundle_json(&json_str, &mode_str))
}

/// Calculate a full JSON report from a step-test document.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lactate_free_string`.
/// - Returns NULL on error; call `lactate_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lactate_calculate_document(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    finish(ThresholdEngine::new().process_json(&json_str))
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to a ThresholdEngine
pub struct LactateEngineHandle {
    engine: ThresholdEngine,
}

/// Create an engine. `config_json` may be NULL for the default configuration.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `lactate_engine_free`.
/// - Returns NULL on error; call `lactate_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lactate_engine_new(config_json: *const c_char) -> *mut LactateEngineHandle {
    clear_last_error();

    let mut engine = ThresholdEngine::new();
    if !config_json.is_null() {
        let Some(config) = cstr_to_string(config_json) else {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        };
        if let Err(e) = engine.load_config(&config) {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    }

    Box::into_raw(Box::new(LactateEngineHandle { engine }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `lactate_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lactate_engine_free(engine: *mut LactateEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Calculate a JSON report from a step-test document with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `lactate_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `lactate_free_string`.
/// - Returns NULL on error; call `lactate_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn lactate_engine_process(
    engine: *const LactateEngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    finish(handle.engine.process_json(&json_str))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a `lactate_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `lactate_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn lactate_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next `lactate_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn lactate_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn lactate_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

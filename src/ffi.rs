//! FFI bindings for Treetest Flux
//!
//! This module provides C-compatible functions for calling the results engine
//! from other languages. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `treeflux_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{study_to_csv, study_to_results, ResultsProcessor};

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

/// Run `f` on the decoded input and hand the result back across the boundary
unsafe fn with_json_input<F>(json: *const c_char, f: F) -> *mut c_char
where
    F: FnOnce(&str) -> Result<String, ComputeError>,
{
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match f(&json_str) {
        Ok(output) => string_to_cstr(&output),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyse a study snapshot and return the results report JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `treeflux_free_string`.
/// - Returns NULL on error; call `treeflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn treeflux_study_to_results(json: *const c_char) -> *mut c_char {
    with_json_input(json, study_to_results)
}

/// Export a study snapshot as CSV text.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `treeflux_free_string`.
/// - Returns NULL on error; call `treeflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn treeflux_study_to_csv(json: *const c_char) -> *mut c_char {
    with_json_input(json, study_to_csv)
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to a ResultsProcessor
pub struct ResultsProcessorHandle {
    processor: ResultsProcessor,
}

/// Create a new ResultsProcessor.
///
/// `include_csv_rows` non-zero embeds the flat export rows in every report.
///
/// # Safety
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `treeflux_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn treeflux_processor_new(include_csv_rows: i32) -> *mut ResultsProcessorHandle {
    clear_last_error();

    let processor = ResultsProcessor::new().include_csv_rows(include_csv_rows != 0);
    Box::into_raw(Box::new(ResultsProcessorHandle { processor }))
}

/// Free a ResultsProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `treeflux_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn treeflux_processor_free(processor: *mut ResultsProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Analyse a study snapshot with a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `treeflux_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `treeflux_free_string`.
/// - Returns NULL on error; call `treeflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn treeflux_processor_process(
    processor: *mut ResultsProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;
    with_json_input(json, |s| handle.processor.process(s))
}

/// Free a string returned by treeflux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a treeflux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn treeflux_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next treeflux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn treeflux_last_error() -> *const c_char {
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
pub unsafe extern "C" fn treeflux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

//! FFI bindings for Stride Flux
//!
//! C-compatible entry points for hosts embedding the engine. All functions
//! take null-terminated C strings and return allocated memory that must be
//! freed by the caller using `stride_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::AnalysisConfig;
use crate::pipeline::{analyze_stream_json, personal_records_json, StrideProcessor};

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

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn result_to_cstr<E: std::fmt::Display>(result: Result<String, E>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze one raw stream and return the summary payload as JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_analyze_stream(
    json: *const c_char,
    split_length_m: f64,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    result_to_cstr(analyze_stream_json(&json_str, split_length_m))
}

/// Compute personal records over a JSON array of activities.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_personal_records(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    result_to_cstr(personal_records_json(&json_str))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a StrideProcessor
pub struct StrideProcessorHandle {
    processor: StrideProcessor,
}

/// Create a processor. `config_json` may be NULL for defaults.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `stride_processor_free`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_new(
    config_json: *const c_char,
) -> *mut StrideProcessorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        AnalysisConfig::default()
    } else {
        let parsed = cstr_to_string(config_json)
            .ok_or_else(|| "Invalid config string pointer".to_string())
            .and_then(|s| AnalysisConfig::from_json(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => config,
            Err(msg) => {
                set_last_error(&msg);
                return ptr::null_mut();
            }
        }
    };

    match StrideProcessor::with_config(config) {
        Ok(processor) => Box::into_raw(Box::new(StrideProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_free(processor: *mut StrideProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Analyze a raw stream with the processor's configuration.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_analyze(
    processor: *const StrideProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = processor.as_ref() else {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    };
    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    result_to_cstr(handle.processor.analyze_json(&json_str))
}

/// Personal records for a user, memoized until `stride_processor_ingest`.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`.
/// - `user_id` and `json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `stride_free_string`.
/// - Returns NULL on error; call `stride_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_records(
    processor: *const StrideProcessorHandle,
    user_id: *const c_char,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = processor.as_ref() else {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    };
    let Some(user) = cstr_to_string(user_id) else {
        set_last_error("Invalid user_id string pointer");
        return ptr::null_mut();
    };
    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    result_to_cstr(handle.processor.personal_records_json(&user, &json_str))
}

/// Notify the processor of new telemetry for a user.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `stride_processor_new`.
/// - `user_id` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn stride_processor_ingest(
    processor: *const StrideProcessorHandle,
    user_id: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(handle) = processor.as_ref() else {
        set_last_error("Null processor pointer");
        return -1;
    };
    let Some(user) = cstr_to_string(user_id) else {
        set_last_error("Invalid user_id string pointer");
        return -1;
    };

    handle.processor.ingest(&user);
    0
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

// ============================================================================
// Version Information
// ============================================================================

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

    fn sample_stream_json() -> CString {
        CString::new(
            r#"{
                "distance": { "data": [0, 500, 1000, 1200, 1500] },
                "time": { "data": [0, 150, 300, 360, 500] },
                "heartrate": { "data": [140, 142, null, 0, 150] }
            }"#,
        )
        .unwrap()
    }

    fn sample_activities_json() -> CString {
        let distance: Vec<f64> = (0..=100).map(|i| i as f64 * 10.0).collect();
        let time: Vec<f64> = (0..=100).map(|i| i as f64 * 3.0).collect();
        let json = serde_json::json!([{
            "id": 7,
            "name": "Morning Run",
            "type": "Run",
            "start_date": "2024-04-01T06:00:00Z",
            "streams": { "distance": distance, "time": time }
        }]);
        CString::new(json.to_string()).unwrap()
    }

    #[test]
    fn test_ffi_analyze_stream() {
        let json = sample_stream_json();

        unsafe {
            let result = stride_analyze_stream(json.as_ptr(), 1000.0);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(value["summary"]["splits"].as_array().unwrap().len(), 2);

            stride_free_string(result);
        }
    }

    #[test]
    fn test_ffi_personal_records() {
        let json = sample_activities_json();

        unsafe {
            let result = stride_personal_records(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"source_activity_id\":\"7\""));

            stride_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = stride_processor_new(ptr::null());
            assert!(!processor.is_null());

            let user = CString::new("user-1").unwrap();
            let json = sample_activities_json();

            let records = stride_processor_records(processor, user.as_ptr(), json.as_ptr());
            assert!(!records.is_null());
            stride_free_string(records);

            assert_eq!(stride_processor_ingest(processor, user.as_ptr()), 0);

            let stream = sample_stream_json();
            let summary = stride_processor_analyze(processor, stream.as_ptr());
            assert!(!summary.is_null());
            stride_free_string(summary);

            stride_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_processor_rejects_bad_config() {
        let config = CString::new(r#"{"split_length_m": -1}"#).unwrap();

        unsafe {
            let processor = stride_processor_new(config.as_ptr());
            assert!(processor.is_null());

            let error = CStr::from_ptr(stride_last_error()).to_str().unwrap();
            assert!(error.contains("split length"));
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let result = stride_analyze_stream(invalid_json.as_ptr(), 1000.0);
            assert!(result.is_null());

            let error = stride_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let result = stride_analyze_stream(ptr::null(), 1000.0);
            assert!(result.is_null());
            assert_eq!(stride_processor_ingest(ptr::null(), ptr::null()), -1);
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

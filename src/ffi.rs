//! FFI bindings for ACubed
//!
//! This module provides C-compatible functions for calling ACubed from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `acubed_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{chart_to_features, ffr_chart_to_features, BatchOutcome, ChartProcessor};
use crate::schema::ChartAdapter;

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

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Caller must free the result with `acubed_free_string`.
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a pipeline result across the boundary, recording the error if any.
fn result_to_cstr(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Batch outcomes as a JSON array of `{index, chart_id, payload}` or
/// `{index, chart_id, error}` objects.
fn outcomes_to_json(outcomes: Vec<BatchOutcome>) -> Result<String, ComputeError> {
    let entries: Vec<serde_json::Value> = outcomes
        .into_iter()
        .map(|outcome| -> Result<serde_json::Value, serde_json::Error> {
            let mut entry = serde_json::json!({
                "index": outcome.index,
                "chart_id": outcome.chart_id,
            });
            match outcome.result {
                Ok(payload) => entry["payload"] = serde_json::to_value(payload)?,
                Err(e) => entry["error"] = serde_json::Value::String(e.to_string()),
            }
            Ok(entry)
        })
        .collect::<Result<_, _>>()?;
    Ok(serde_json::to_string(&entries)?)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute features for keytap records or a chart document.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `acubed_free_string`.
/// - Returns NULL on error; call `acubed_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acubed_chart_features(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(chart_to_features(json_str))
}

/// Compute features for an FFR API chart payload.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `acubed_free_string`.
/// - Returns NULL on error; call `acubed_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acubed_ffr_chart_features(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(ffr_chart_to_features(json_str))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a ChartProcessor
pub struct ChartProcessorHandle {
    processor: ChartProcessor,
}

/// Create a processor from an engine configuration JSON.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Must be freed with `acubed_processor_free`.
/// - Returns NULL on error; call `acubed_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acubed_processor_new(
    config_json: *const c_char,
) -> *mut ChartProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        Ok(ChartProcessor::new())
    } else {
        match cstr_to_string(config_json) {
            Some(s) => EngineConfig::from_json(&s).and_then(ChartProcessor::with_config),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match processor {
        Ok(processor) => Box::into_raw(Box::new(ChartProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a ChartProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `acubed_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn acubed_processor_free(processor: *mut ChartProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Compute features for one chart with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `acubed_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `acubed_free_string`.
/// - Returns NULL on error; call `acubed_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acubed_processor_process(
    processor: *const ChartProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(handle.processor.process_json(&json_str))
}

/// Compute features for an NDJSON batch of chart documents.
///
/// Charts that fail carry an `error` entry instead of a `payload`; only a
/// malformed batch makes the call itself fail.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `acubed_processor_new`.
/// - `ndjson` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `acubed_free_string`.
/// - Returns NULL on error; call `acubed_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acubed_processor_process_batch(
    processor: *const ChartProcessorHandle,
    ndjson: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let ndjson_str = match cstr_to_string(ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid NDJSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = ChartAdapter::parse_ndjson(&ndjson_str)
        .and_then(|documents| outcomes_to_json(handle.processor.process_batch(&documents)));
    result_to_cstr(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by ACubed functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an ACubed function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn acubed_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next ACubed function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn acubed_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the ACubed library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn acubed_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_records_json() -> CString {
        CString::new(
            r#"[
                {"time": 0.0, "step": "1000"},
                {"time": 0.0, "step": "0001"},
                {"time": 0.25, "step": "0100"},
                {"time": 0.5, "step": "1000"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_chart_features() {
        let json = sample_records_json();

        unsafe {
            let result = acubed_chart_features(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("acubed.features.v1"));
            assert!(acubed_last_error().is_null());

            acubed_free_string(result);
        }
    }

    #[test]
    fn test_ffi_ffr_chart_features() {
        let json = CString::new(r#"{"name": "Song", "chart": [[1, "L", "red", 100], [2, "U", "red", 300]]}"#)
            .unwrap();

        unsafe {
            let result = acubed_ffr_chart_features(json.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"chart_name\": \"Song\""));

            acubed_free_string(result);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let invalid = CString::new("not valid json").unwrap();

        unsafe {
            let result = acubed_chart_features(invalid.as_ptr());
            assert!(result.is_null());

            let error = acubed_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            assert!(acubed_chart_features(ptr::null()).is_null());
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let config = CString::new(r#"{"aggregations": ["median"]}"#).unwrap();
        let json = sample_records_json();
        let batch = CString::new(
            "{\"_id\": 1, \"chart\": [{\"time\": 0.0, \"step\": \"1000\"}]}\n\
             {\"_id\": 2, \"chart\": []}\n",
        )
        .unwrap();

        unsafe {
            let processor = acubed_processor_new(config.as_ptr());
            assert!(!processor.is_null());

            let result = acubed_processor_process(processor, json.as_ptr());
            assert!(!result.is_null());
            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"median\""));
            acubed_free_string(result);

            let result = acubed_processor_process_batch(processor, batch.as_ptr());
            assert!(!result.is_null());
            let outcomes: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert!(outcomes[0]["payload"].is_object());
            assert!(outcomes[1]["error"].is_string());
            acubed_free_string(result);

            acubed_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_processor_rejects_bad_config() {
        let config = CString::new(r#"{"num_channels": 0}"#).unwrap();
        unsafe {
            assert!(acubed_processor_new(config.as_ptr()).is_null());
            assert!(!acubed_last_error().is_null());

            let processor = acubed_processor_new(ptr::null());
            assert!(!processor.is_null());
            acubed_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = acubed_version();
            assert!(!version.is_null());
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}

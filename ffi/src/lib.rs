//! C-ABI wrapper around `vitalsource-core`.
//!
//! # Overview
//! Exposes the redemption-code client through `extern "C"` functions so any
//! language with a C FFI can either build requests and classify responses
//! around its own HTTP stack, or let the library perform the call.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `vs_build_*` / `vs_parse_response` mirror the core build/classify split;
//!   `vs_create_code`, `vs_check_code` and `vs_cancel_code` run the whole
//!   lifecycle over the bundled blocking transport.
//! - A single `FfiCodesResult` envelope carries classified responses and
//!   local failures alike.
//! - The C caller owns all returned pointers and must call the matching
//!   `vs_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use vitalsource_core::{ApiError, ApiResponse, ClientConfig, HttpResponse, UreqTransport};

use types::*;

/// Borrow a C string as `&str`. `None` if null or not UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client for `api_key`. `base_url` may be null to target the
/// production service.
///
/// Returns null if `api_key` is null or empty, if `base_url` is invalid, or
/// if an internal panic occurs. Free with `vs_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn vs_client_new(
    api_key: *const c_char,
    base_url: *const c_char,
) -> *mut FfiCodesClient {
    catch_unwind(|| {
        let Some(key) = (unsafe { read_str(api_key) }) else {
            return std::ptr::null_mut();
        };
        let mut config = ClientConfig::default();
        if !base_url.is_null() {
            match unsafe { read_str(base_url) } {
                Some(url) => config.base_url = url.to_string(),
                None => return std::ptr::null_mut(),
            }
        }
        match vitalsource_core::CodesClient::with_config(key, config) {
            Ok(client) => Box::into_raw(Box::new(FfiCodesClient { inner: client })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `vs_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn vs_client_free(client: *mut FfiCodesClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build `POST v3/codes` for one default-licensed code of `sku`.
///
/// Returns null if an argument is null or not UTF-8.
/// The caller must free the returned pointer with `vs_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn vs_build_create_code(
    client: *const FfiCodesClient,
    sku: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(sku) = (unsafe { read_str(sku) }) else {
            return std::ptr::null_mut();
        };
        match client.inner.build_create_code(sku) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build `GET v4/codes/{code}`.
///
/// Returns null if an argument is null or not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn vs_build_check_code(
    client: *const FfiCodesClient,
    code: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match unsafe { read_str(code) } {
            Some(code) => FfiHttpRequest::from_core(client.inner.build_check_code(code)),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build `DELETE v4/codes/{code}`.
///
/// Returns null if an argument is null or not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn vs_build_cancel_code(
    client: *const FfiCodesClient,
    code: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match unsafe { read_str(code) } {
            Some(code) => FfiHttpRequest::from_core(client.inner.build_cancel_code(code)),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Classify
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// treated as empty; invalid UTF-8 is replaced.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(resp.body) }
            .to_string_lossy()
            .into_owned()
    };
    HttpResponse::new(resp.status, body)
}

/// Classify a response the caller obtained by executing a built request.
#[unsafe(no_mangle)]
pub extern "C" fn vs_parse_response(
    client: *const FfiCodesClient,
    response: *const FfiHttpResponse,
) -> *mut FfiCodesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCodesResult::null_arg("client");
        }
        if response.is_null() {
            return FfiCodesResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        FfiCodesResult::from_response(client.inner.parse_response(ffi_response_to_core(resp)))
    })
    .unwrap_or_else(|_| FfiCodesResult::panic("panic in vs_parse_response"))
}

// ---------------------------------------------------------------------------
// Operations (blocking HTTP)
// ---------------------------------------------------------------------------

fn into_result(outcome: Result<ApiResponse, ApiError>) -> *mut FfiCodesResult {
    match outcome {
        Ok(resp) => FfiCodesResult::from_response(resp),
        Err(e) => FfiCodesResult::from_error(e),
    }
}

/// Create one code for `sku`, performing the HTTP call. Blocks.
#[unsafe(no_mangle)]
pub extern "C" fn vs_create_code(
    client: *const FfiCodesClient,
    sku: *const c_char,
) -> *mut FfiCodesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCodesResult::null_arg("client");
        }
        if sku.is_null() {
            return FfiCodesResult::null_arg("sku");
        }
        let client = unsafe { &*client };
        let Some(sku) = (unsafe { read_str(sku) }) else {
            return FfiCodesResult::invalid_arg("sku");
        };
        into_result(client.inner.create_code(&UreqTransport::new(), sku))
    })
    .unwrap_or_else(|_| FfiCodesResult::panic("panic in vs_create_code"))
}

/// Read a code's status and metadata, performing the HTTP call. Blocks.
#[unsafe(no_mangle)]
pub extern "C" fn vs_check_code(
    client: *const FfiCodesClient,
    code: *const c_char,
) -> *mut FfiCodesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCodesResult::null_arg("client");
        }
        if code.is_null() {
            return FfiCodesResult::null_arg("code");
        }
        let client = unsafe { &*client };
        let Some(code) = (unsafe { read_str(code) }) else {
            return FfiCodesResult::invalid_arg("code");
        };
        into_result(client.inner.check_code(&UreqTransport::new(), code))
    })
    .unwrap_or_else(|_| FfiCodesResult::panic("panic in vs_check_code"))
}

/// Cancel a code, performing the HTTP call. Blocks.
#[unsafe(no_mangle)]
pub extern "C" fn vs_cancel_code(
    client: *const FfiCodesClient,
    code: *const c_char,
) -> *mut FfiCodesResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiCodesResult::null_arg("client");
        }
        if code.is_null() {
            return FfiCodesResult::null_arg("code");
        }
        let client = unsafe { &*client };
        let Some(code) = (unsafe { read_str(code) }) else {
            return FfiCodesResult::invalid_arg("code");
        };
        into_result(client.inner.cancel_code(&UreqTransport::new(), code))
    })
    .unwrap_or_else(|_| FfiCodesResult::panic("panic in vs_cancel_code"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Free an `FfiHttpRequest` returned by any `vs_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn vs_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.endpoint);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiCodesResult` returned by `vs_parse_response` or an operation.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn vs_free_result(result: *mut FfiCodesResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.data_json);
        free_c_string(result.raw_body);
        if !result.errors.is_null() && result.errors_len > 0 {
            let entries = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    result.errors,
                    result.errors_len as usize,
                ))
            };
            for e in entries.iter() {
                free_c_string(e.key);
                free_c_string(e.message);
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn vs_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

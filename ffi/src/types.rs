//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. The decoded response tree crosses the
//! boundary as a JSON string so C callers can use any JSON library on it.
//! Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use vitalsource_core::{ApiError, ApiResponse, HttpMethod, HttpRequest, ParsedData};

/// Opaque handle to a `CodesClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiCodesClient {
    pub(crate) inner: vitalsource_core::CodesClient,
}

/// Convert to a heap C string. Interior NULs are dropped.
pub(crate) fn into_c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

fn null_or_c_string(s: Option<String>) -> *mut c_char {
    match s {
        Some(s) => into_c_string(s),
        None => std::ptr::null_mut(),
    }
}

/// Move a `Vec` onto the heap as a raw `(ptr, len)` pair; null when empty.
fn vec_into_raw<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let boxed = items.into_boxed_slice();
    (Box::into_raw(boxed) as *mut T, len)
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Delete = 2,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `vs_build_*` functions. The C caller executes the request
/// and passes the response back through `vs_parse_response`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub endpoint: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: into_c_string(k),
                value: into_c_string(v),
            })
            .collect();
        let (headers, headers_len) = vec_into_raw(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: into_c_string(req.url),
            endpoint: into_c_string(req.endpoint),
            headers,
            headers_len,
            body: null_or_c_string(req.body),
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing an HTTP request,
/// then passes a pointer to `vs_parse_response`. The FFI layer reads but does
/// not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Overall status of an `FfiCodesResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiStatus {
    /// The call completed and the service reported success.
    Ok = 0,
    /// The call completed; `errors` holds what the service reported.
    RemoteError = 1,
    /// The HTTP exchange itself failed.
    Transport = 2,
    NullArg = 3,
    InvalidArg = 4,
    Panic = 5,
}

/// Which shape `data_json` has.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiDataTag {
    Data = 0,
    Empty = 1,
    Malformed = 2,
    Failed = 3,
}

/// One entry of the error set.
#[repr(C)]
pub struct FfiErrorEntry {
    pub key: *mut c_char,
    pub message: *mut c_char,
}

/// Result envelope for parse and operation functions.
///
/// When `status` is `Ok` or `RemoteError`, `data_tag`, `raw_body` and
/// `errors` describe the classified response, and `data_json` holds the
/// decoded tree when `data_tag` is `Data`. For local failures only
/// `error_message` is set.
///
/// `raw_body` is the body as received except that NUL bytes are removed,
/// since it crosses as a NUL-terminated string. Hosts that need the exact
/// bytes should do their own I/O and keep the response they fed to
/// `vs_parse_response`.
#[repr(C)]
pub struct FfiCodesResult {
    pub status: FfiStatus,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data_json: *mut c_char,
    pub raw_body: *mut c_char,
    pub errors: *mut FfiErrorEntry,
    pub errors_len: u32,
}

impl FfiCodesResult {
    fn local_failure(status: FfiStatus, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiCodesResult {
            status,
            error_message: into_c_string(msg),
            http_status: 0,
            data_tag: FfiDataTag::Failed,
            data_json: std::ptr::null_mut(),
            raw_body: std::ptr::null_mut(),
            errors: std::ptr::null_mut(),
            errors_len: 0,
        }))
    }

    /// Build a result from a classified response.
    pub(crate) fn from_response(resp: ApiResponse) -> *mut Self {
        let status = if resp.is_success() {
            FfiStatus::Ok
        } else {
            FfiStatus::RemoteError
        };
        let (data_tag, data_json) = match resp.data() {
            ParsedData::Data(value) => (FfiDataTag::Data, Some(value.to_string())),
            ParsedData::Empty => (FfiDataTag::Empty, None),
            ParsedData::Malformed { .. } => (FfiDataTag::Malformed, None),
            ParsedData::Failed => (FfiDataTag::Failed, None),
        };
        let entries: Vec<FfiErrorEntry> = resp
            .errors()
            .iter()
            .map(|(key, message)| FfiErrorEntry {
                key: into_c_string(key),
                message: into_c_string(message),
            })
            .collect();
        let (errors, errors_len) = vec_into_raw(entries);

        Box::into_raw(Box::new(FfiCodesResult {
            status,
            error_message: std::ptr::null_mut(),
            http_status: resp.status(),
            data_tag,
            data_json: null_or_c_string(data_json),
            raw_body: into_c_string(resp.raw_body()),
            errors,
            errors_len,
        }))
    }

    /// Build a result from a local `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let status = match &err {
            ApiError::Transport { .. } => FfiStatus::Transport,
            ApiError::InvalidBaseUrl(_) | ApiError::MissingApiKey | ApiError::Serialization(_) => {
                FfiStatus::InvalidArg
            }
        };
        Self::local_failure(status, err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::local_failure(FfiStatus::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(name: &str) -> *mut Self {
        Self::local_failure(FfiStatus::InvalidArg, format!("argument is not valid UTF-8: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::local_failure(FfiStatus::Panic, msg.to_string())
    }
}

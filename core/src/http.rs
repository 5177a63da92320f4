//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain, immutable values. A builder on
//! `CodesClient` produces an `HttpRequest`, a `Transport` turns it into an
//! `HttpResponse`, and the classifier consumes that response. Nothing is
//! stored between those steps, so one client can serve any number of calls.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross FFI
//! boundaries without lifetime concerns.

use std::fmt;

/// HTTP method for a request. The remote API only needs these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `endpoint` is the path relative to the service base URL (`v4/codes/ABC`);
/// `url` is the absolute URL the transport should hit. Headers already
/// include the API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport`, or constructed by hand by hosts that do their
/// own I/O, then passed to `CodesClient::parse_response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Decode a response body without failing.
///
/// UTF-8 is taken as is. A body that is not UTF-8 but whose XML declaration
/// names ISO-8859-1 is decoded byte for byte. Anything else is decoded lossily,
/// so the classifier always sees the status and whatever text survived.
pub fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) if declares_latin1(bytes) => bytes.iter().map(|&b| char::from(b)).collect(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn declares_latin1(bytes: &[u8]) -> bool {
    let Some(rest) = bytes.strip_prefix(b"<?xml") else {
        return false;
    };
    let end = rest
        .windows(2)
        .position(|w| w == b"?>".as_slice())
        .unwrap_or(rest.len());
    let decl = String::from_utf8_lossy(&rest[..end]).to_ascii_lowercase();
    let Some(pos) = decl.find("encoding") else {
        return false;
    };
    let value = decl[pos + "encoding".len()..]
        .trim_start()
        .trim_start_matches('=')
        .trim_start()
        .trim_start_matches(['"', '\''])
        .split(['"', '\''])
        .next()
        .unwrap_or_default();
    matches!(value, "iso-8859-1" | "latin1" | "latin-1")
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

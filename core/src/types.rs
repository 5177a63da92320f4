//! Domain values for the redemption-code API.
//!
//! # Design
//! `ApiResponse` is the one outcome shape every operation returns. Its fields
//! are private and it is only built by the classifier, which keeps "success"
//! and "error" mutually exclusive: whenever `errors()` is non-empty,
//! `data()` is `ParsedData::Failed`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which HTTP-status failures are recorded in an `ErrorSet`.
pub const HTTP_ERROR_KEY: &str = "http";

/// Parameters for `POST v3/codes`. Defaults mint one code with default
/// licenses for both the installed and online readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOrder {
    /// SKU, VBID, eISBN or FPID; the service accepts any of them.
    pub sku: String,
    #[serde(default = "default_license")]
    pub license_type: String,
    #[serde(default = "default_license")]
    pub online_license_type: String,
    #[serde(default = "default_num_codes")]
    pub num_codes: u32,
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_license() -> String {
    "default".to_string()
}

fn default_num_codes() -> u32 {
    1
}

fn default_tag() -> String {
    "postman_created_code".to_string()
}

impl CodeOrder {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            license_type: default_license(),
            online_license_type: default_license(),
            num_codes: default_num_codes(),
            tag: default_tag(),
        }
    }

    pub fn with_num_codes(mut self, num_codes: u32) -> Self {
        self.num_codes = num_codes;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_license_types(
        mut self,
        license_type: impl Into<String>,
        online_license_type: impl Into<String>,
    ) -> Self {
        self.license_type = license_type.into();
        self.online_license_type = online_license_type.into();
        self
    }
}

/// Decoded payload of a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParsedData {
    /// The body decoded into a tree.
    Data(Value),
    /// The call succeeded and the body carried nothing.
    Empty,
    /// The call succeeded but the body was not well-formed XML. Not an error;
    /// kept apart from `Empty` so callers can notice it.
    Malformed { reason: String },
    /// Something failed; see the error set.
    Failed,
}

impl ParsedData {
    pub fn is_success(&self) -> bool {
        !matches!(self, ParsedData::Failed)
    }

    /// True for the two "succeeded without data" outcomes.
    pub fn is_true_sentinel(&self) -> bool {
        matches!(self, ParsedData::Empty | ParsedData::Malformed { .. })
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            ParsedData::Data(value) => Some(value),
            _ => None,
        }
    }

    /// The boolean sentinel, if this outcome is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParsedData::Data(_) => None,
            ParsedData::Empty | ParsedData::Malformed { .. } => Some(true),
            ParsedData::Failed => Some(false),
        }
    }
}

/// Error identifier to human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorSet(BTreeMap<String, String>);

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.insert(key.into(), message.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn http(&self) -> Option<&str> {
        self.get(HTTP_ERROR_KEY)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Typed view of one `ErrorSet` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The HTTP status marked the call as failed; the body was not parsed.
    Status { status: u16, message: String },
    /// The body carried an `error-code` / `error-text` pair.
    Application { code: String, text: String },
}

/// Classified outcome of one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    data: ParsedData,
    errors: ErrorSet,
    status: u16,
    raw_body: String,
}

impl ApiResponse {
    /// Enforces the invariant: any recorded error forces `Failed`.
    pub(crate) fn new(data: ParsedData, errors: ErrorSet, status: u16, raw_body: String) -> Self {
        let data = if errors.is_empty() {
            data
        } else {
            ParsedData::Failed
        };
        Self {
            data,
            errors,
            status,
            raw_body,
        }
    }

    pub fn data(&self) -> &ParsedData {
        &self.data
    }

    pub fn into_data(self) -> ParsedData {
        self.data
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn remote_errors(&self) -> Vec<RemoteError> {
        self.errors
            .iter()
            .map(|(key, message)| {
                if key == HTTP_ERROR_KEY {
                    RemoteError::Status {
                        status: self.status,
                        message: message.to_string(),
                    }
                } else {
                    RemoteError::Application {
                        code: key.to_string(),
                        text: message.to_string(),
                    }
                }
            })
            .collect()
    }
}

//! Client configuration and credentials.
//!
//! The core never reads the environment or the filesystem; hosts build a
//! `ClientConfig` however they like (it is serde-friendly) and hand the API
//! key over at construction time.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

/// Production endpoint of the redemption-code API.
pub const DEFAULT_BASE_URL: &str = "https://api.vitalsource.com/";

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-VitalSource-API-Key";

/// Static API key. Immutable once constructed, and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        Ok(Self { api_key })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The `(name, value)` pair attached to every outgoing request.
    pub fn header(&self) -> (String, String) {
        (API_KEY_HEADER.to_string(), self.api_key.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// How HTTP status codes outside the known set are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Only 403, 404 and 429 are failures; everything else falls through to
    /// body parsing.
    #[default]
    AllowList,
    /// Any non-2xx status is a failure. Unlisted codes get a generic message.
    Strict,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service base URL; endpoints are appended verbatim.
    pub base_url: String,
    pub status_policy: StatusPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            status_policy: StatusPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// Validate the base URL and normalize it to end with exactly one `/`.
    pub(crate) fn normalized_base_url(&self) -> Result<String, ApiError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let parsed =
            Url::parse(trimmed).map_err(|e| ApiError::InvalidBaseUrl(format!("{trimmed}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(trimmed.to_string()));
        }
        Ok(format!("{trimmed}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_reject_blank_key() {
        assert!(matches!(Credentials::new(""), Err(ApiError::MissingApiKey)));
        assert!(matches!(Credentials::new("   "), Err(ApiError::MissingApiKey)));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("super-secret").unwrap();
        let printed = format!("{creds:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn credentials_header_uses_service_name() {
        let creds = Credentials::new("k").unwrap();
        assert_eq!(
            creds.header(),
            ("X-VitalSource-API-Key".to_string(), "k".to_string())
        );
    }

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let cfg = ClientConfig::default().with_base_url("http://localhost:3000");
        assert_eq!(cfg.normalized_base_url().unwrap(), "http://localhost:3000/");

        let cfg = ClientConfig::default().with_base_url("http://localhost:3000//");
        assert_eq!(cfg.normalized_base_url().unwrap(), "http://localhost:3000/");

        let cfg = ClientConfig::default().with_base_url("https://api.vitalsource.com/api/");
        assert_eq!(cfg.normalized_base_url().unwrap(), "https://api.vitalsource.com/api/");
    }

    #[test]
    fn base_url_must_be_http() {
        let cfg = ClientConfig::default().with_base_url("ftp://example.com");
        assert!(matches!(cfg.normalized_base_url(), Err(ApiError::InvalidBaseUrl(_))));

        let cfg = ClientConfig::default().with_base_url("not a url");
        assert!(matches!(cfg.normalized_base_url(), Err(ApiError::InvalidBaseUrl(_))));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ClientConfig = serde_json::from_str(r#"{"status_policy":"strict"}"#).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.status_policy, StatusPolicy::Strict);
    }
}

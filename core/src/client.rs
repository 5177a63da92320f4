//! Request builder and response classifier for the redemption-code API.
//!
//! # Design
//! `CodesClient` holds only its credentials and configuration and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and the shared `parse_response`
//! classifier that consumes an `HttpResponse`. `execute` and the three
//! operation methods glue the two together through a `Transport`, but hosts
//! are free to perform the round-trip themselves.
//!
//! Caller input is encoded on build: the SKU goes through the XML writer's
//! attribute escaping and codes are percent-encoded as a path segment.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Writer;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, Credentials, StatusPolicy};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{ApiResponse, CodeOrder, ErrorSet, ParsedData, HTTP_ERROR_KEY};
use crate::xml;

const CREATE_ENDPOINT: &str = "v3/codes";
const CODES_ENDPOINT: &str = "v4/codes";

/// RFC 3986 path-segment set.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Synchronous, stateless client for the redemption-code API.
///
/// Cheap to clone and safe to share between threads; every call works on its
/// own request and response values.
#[derive(Debug, Clone)]
pub struct CodesClient {
    credentials: Credentials,
    base_url: String,
    status_policy: StatusPolicy,
}

impl CodesClient {
    /// Client for the production service with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_config(api_key, ClientConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            credentials: Credentials::new(api_key)?,
            base_url: config.normalized_base_url()?,
            status_policy: config.status_policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.status_policy
    }

    // ------------------------------------------------------------------
    // Request builder
    // ------------------------------------------------------------------

    /// `POST v3/codes` for a single default-licensed code.
    pub fn build_create_code(&self, sku: &str) -> Result<HttpRequest, ApiError> {
        self.build_create_codes(&CodeOrder::new(sku))
    }

    pub fn build_create_codes(&self, order: &CodeOrder) -> Result<HttpRequest, ApiError> {
        let body = code_order_xml(order)?;
        let mut request = self.request(HttpMethod::Post, CREATE_ENDPOINT.to_string(), Some(body));
        request
            .headers
            .push(("Content-Type".to_string(), "text/xml".to_string()));
        Ok(request)
    }

    /// `GET v4/codes/{code}`
    pub fn build_check_code(&self, code: &str) -> HttpRequest {
        self.request(HttpMethod::Get, code_endpoint(code), None)
    }

    /// `DELETE v4/codes/{code}`
    pub fn build_cancel_code(&self, code: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, code_endpoint(code), None)
    }

    fn request(&self, method: HttpMethod, endpoint: String, body: Option<String>) -> HttpRequest {
        debug!(%method, %endpoint, "built request");
        HttpRequest {
            method,
            url: format!("{}{endpoint}", self.base_url),
            endpoint,
            headers: vec![self.credentials.header()],
            body,
        }
    }

    // ------------------------------------------------------------------
    // Response classifier
    // ------------------------------------------------------------------

    /// Classify a raw response into data or errors.
    ///
    /// A failing status short-circuits: the body is kept as raw text but never
    /// parsed. Otherwise the body is decoded and checked for an embedded
    /// `error-code`.
    pub fn parse_response(&self, response: HttpResponse) -> ApiResponse {
        let HttpResponse { status, body, .. } = response;
        let mut errors = ErrorSet::new();

        if let Some(message) = status_error(status, self.status_policy) {
            warn!(status, %message, "request rejected by HTTP status");
            errors.insert(HTTP_ERROR_KEY, message);
            return ApiResponse::new(ParsedData::Failed, errors, status, body);
        }

        let data = match xml::parse_document(&body) {
            Ok(Some(Value::Object(map))) if map.is_empty() => ParsedData::Empty,
            Ok(Some(value)) => ParsedData::Data(value),
            Ok(None) => ParsedData::Empty,
            Err(e) => {
                debug!(status, error = %e, "response body is not well-formed XML");
                ParsedData::Malformed {
                    reason: e.to_string(),
                }
            }
        };

        if let Some((code, text)) = data.as_data().and_then(application_error) {
            warn!(status, %code, %text, "service reported an application error");
            errors.insert(code, text);
        }

        ApiResponse::new(data, errors, status, body)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Send `request` through `transport` and classify the result.
    ///
    /// Remote failures are returned inside the `ApiResponse`; `Err` means the
    /// exchange itself did not complete.
    pub fn execute<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: &HttpRequest,
    ) -> Result<ApiResponse, ApiError> {
        let response = transport.send(request)?;
        Ok(self.parse_response(response))
    }

    pub fn create_code<T: Transport + ?Sized>(
        &self,
        transport: &T,
        sku: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(transport, &self.build_create_code(sku)?)
    }

    pub fn create_codes<T: Transport + ?Sized>(
        &self,
        transport: &T,
        order: &CodeOrder,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(transport, &self.build_create_codes(order)?)
    }

    pub fn check_code<T: Transport + ?Sized>(
        &self,
        transport: &T,
        code: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(transport, &self.build_check_code(code))
    }

    pub fn cancel_code<T: Transport + ?Sized>(
        &self,
        transport: &T,
        code: &str,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(transport, &self.build_cancel_code(code))
    }
}

fn code_endpoint(code: &str) -> String {
    format!(
        "{CODES_ENDPOINT}/{}",
        utf8_percent_encode(code, PATH_SEGMENT)
    )
}

fn serialization(e: impl std::fmt::Display) -> ApiError {
    ApiError::Serialization(e.to_string())
}

/// Render the `<codes .../>` request document.
pub fn code_order_xml(order: &CodeOrder) -> Result<String, ApiError> {
    let num_codes = order.num_codes.to_string();
    let mut codes = BytesStart::new("codes");
    codes.push_attribute(("sku", order.sku.as_str()));
    codes.push_attribute(("license-type", order.license_type.as_str()));
    codes.push_attribute(("online-license-type", order.online_license_type.as_str()));
    codes.push_attribute(("num-codes", num_codes.as_str()));
    codes.push_attribute(("tag", order.tag.as_str()));

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(serialization)?;
    writer
        .write_event(Event::Empty(codes))
        .map_err(serialization)?;
    String::from_utf8(writer.into_inner()).map_err(serialization)
}

/// Map a status code to the message recorded under the `http` key, if the
/// status counts as a failure under `policy`.
pub fn status_error(status: u16, policy: StatusPolicy) -> Option<String> {
    let message = match status {
        403 => "403: Permissions Denied".to_string(),
        404 => "404: Not Found".to_string(),
        429 => "429: Rate Limit Reached".to_string(),
        200..=299 => return None,
        other => match policy {
            StatusPolicy::AllowList => return None,
            StatusPolicy::Strict => format!("{other}: Unexpected HTTP Status"),
        },
    };
    Some(message)
}

/// Extract a top-level `error-code` / `error-text` pair.
fn application_error(value: &Value) -> Option<(String, String)> {
    let map = value.as_object()?;
    let code = leaf_text(map.get("error-code")?);
    let text = map.get("error-text").map(leaf_text).unwrap_or_default();
    Some((code, text))
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get(xml::TEXT_KEY) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

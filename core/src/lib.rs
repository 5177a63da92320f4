//! Synchronous client core for the VitalSource redemption-code API.
//!
//! # Overview
//! Three operations are supported: create a code for a SKU, check a code,
//! and cancel a code. Each one runs the same lifecycle:
//! build an `HttpRequest`, send it through a `Transport`, then classify the
//! `HttpResponse` into an `ApiResponse` carrying either decoded data or an
//! `ErrorSet`.
//!
//! # Design
//! - `CodesClient` is stateless apart from its credentials and config, so
//!   calls never observe each other's results.
//! - Remote failures (HTTP status, embedded `error-code`) are data in the
//!   `ApiResponse`; only local failures are `Err(ApiError)`.
//! - Response bodies are decoded into a loose `serde_json::Value` tree since
//!   the service's XML has no stable schema.
//!
//! ```no_run
//! use vitalsource_core::{CodesClient, UreqTransport};
//!
//! # fn main() -> Result<(), vitalsource_core::ApiError> {
//! let client = CodesClient::new("my-api-key")?;
//! let transport = UreqTransport::new();
//! let created = client.create_code(&transport, "9780000000001")?;
//! if created.is_success() {
//!     println!("{:?}", created.data());
//! } else {
//!     for (code, message) in created.errors().iter() {
//!         eprintln!("{code}: {message}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod xml;

pub use client::CodesClient;
pub use config::{ClientConfig, Credentials, StatusPolicy, API_KEY_HEADER, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{decode_body, HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{ApiResponse, CodeOrder, ErrorSet, ParsedData, RemoteError, HTTP_ERROR_KEY};

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use quick_xml::{escape::escape, events::Event, Reader};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-vitalsource-api-key";

/// SKU that always answers 429, for exercising rate-limit handling.
pub const RATE_LIMIT_SKU: &str = "rate-limit";

pub const ERROR_BAD_REQUEST: u32 = 400;
pub const ERROR_UNKNOWN_SKU: u32 = 1013;
pub const ERROR_ALREADY_CANCELLED: u32 = 1101;

const MAX_CODES_PER_ORDER: u32 = 100;

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub api_key: String,
    pub catalog: Vec<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api_key: "test-key".to_string(),
            catalog: vec!["9780000000001".to_string(), "sku-123".to_string()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeState {
    Active,
    Cancelled,
}

impl CodeState {
    fn as_str(self) -> &'static str {
        match self {
            CodeState::Active => "active",
            CodeState::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CodeRecord {
    pub code: String,
    pub sku: String,
    pub tag: String,
    pub state: CodeState,
}

pub struct AppState {
    api_key: String,
    catalog: HashSet<String>,
    codes: RwLock<HashMap<String, CodeRecord>>,
}

pub type Db = Arc<AppState>;

/// The `<codes .../>` document posted to `v3/codes`.
#[derive(Debug, PartialEq, Eq)]
pub struct CodeOrder {
    pub sku: String,
    pub num_codes: u32,
    pub tag: String,
}

pub fn app(config: MockConfig) -> Router {
    let db: Db = Arc::new(AppState {
        api_key: config.api_key,
        catalog: config.catalog.into_iter().collect(),
        codes: RwLock::new(HashMap::new()),
    });
    Router::new()
        .route("/v3/codes", post(create_codes))
        .route("/v4/codes/{code}", get(check_code).delete(cancel_code))
        .with_state(db)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

/// Parse the order document. Returns `None` if it is malformed, has no
/// `<codes>` element, or lacks a usable `sku` / `num-codes`.
pub fn parse_order(body: &str) -> Option<CodeOrder> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"codes" => {
                let mut sku = None;
                let mut num_codes = 1;
                let mut tag = String::new();
                for attr in e.attributes() {
                    let attr = attr.ok()?;
                    let value = attr.unescape_value().ok()?.into_owned();
                    match attr.key.as_ref() {
                        b"sku" => sku = Some(value),
                        b"num-codes" => num_codes = value.parse().ok()?,
                        b"tag" => tag = value,
                        _ => {}
                    }
                }
                let sku = sku.filter(|s| !s.is_empty())?;
                if num_codes == 0 || num_codes > MAX_CODES_PER_ORDER {
                    return None;
                }
                return Some(CodeOrder {
                    sku,
                    num_codes,
                    tag,
                });
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

pub fn error_document(code: u32, text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<response><error-code>{code}</error-code><error-text>{}</error-text></response>",
        escape(text)
    )
}

fn new_code() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}-{}-{}", &hex[0..4], &hex[4..8], &hex[8..12], &hex[12..16])
}

fn xml(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

fn authorized(db: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| key == db.api_key)
}

async fn create_codes(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    if !authorized(&db, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let Some(order) = parse_order(&body) else {
        return xml(StatusCode::OK, error_document(ERROR_BAD_REQUEST, "Invalid request body"));
    };
    if order.sku == RATE_LIMIT_SKU {
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    if !db.catalog.contains(&order.sku) {
        debug!(sku = %order.sku, "unknown sku");
        return xml(StatusCode::OK, error_document(ERROR_UNKNOWN_SKU, "SKU not found in catalog"));
    }

    let mut codes = db.codes.write().await;
    let mut doc = format!("<codes sku=\"{}\">", escape(order.sku.as_str()));
    for _ in 0..order.num_codes {
        let record = CodeRecord {
            code: new_code(),
            sku: order.sku.clone(),
            tag: order.tag.clone(),
            state: CodeState::Active,
        };
        doc.push_str(&format!("<code>{}</code>", record.code));
        codes.insert(record.code.clone(), record);
    }
    doc.push_str("</codes>");
    info!(sku = %order.sku, count = order.num_codes, "minted codes");
    xml(StatusCode::OK, doc)
}

async fn check_code(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    if !authorized(&db, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let codes = db.codes.read().await;
    let Some(record) = codes.get(&code) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    xml(
        StatusCode::OK,
        format!(
            "<code-info><code>{}</code><sku>{}</sku><state>{}</state><tag>{}</tag></code-info>",
            escape(record.code.as_str()),
            escape(record.sku.as_str()),
            record.state.as_str(),
            escape(record.tag.as_str()),
        ),
    )
}

async fn cancel_code(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    if !authorized(&db, &headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let mut codes = db.codes.write().await;
    let Some(record) = codes.get_mut(&code) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if record.state == CodeState::Cancelled {
        return xml(
            StatusCode::OK,
            error_document(ERROR_ALREADY_CANCELLED, "Code already cancelled"),
        );
    }
    record.state = CodeState::Cancelled;
    info!(%code, "cancelled code");
    StatusCode::OK.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_order_reads_attributes() {
        let order = parse_order(
            r#"<?xml version="1.0" encoding="UTF-8"?><codes sku="sku-123" license-type="default" online-license-type="default" num-codes="2" tag="t"/>"#,
        )
        .unwrap();
        assert_eq!(
            order,
            CodeOrder {
                sku: "sku-123".to_string(),
                num_codes: 2,
                tag: "t".to_string(),
            }
        );
    }

    #[test]
    fn parse_order_unescapes_sku() {
        let order = parse_order(r#"<codes sku="a&amp;b"/>"#).unwrap();
        assert_eq!(order.sku, "a&b");
        assert_eq!(order.num_codes, 1);
    }

    #[test]
    fn parse_order_rejects_missing_sku() {
        assert!(parse_order(r#"<codes num-codes="1"/>"#).is_none());
        assert!(parse_order(r#"<codes sku=""/>"#).is_none());
    }

    #[test]
    fn parse_order_rejects_bad_counts() {
        assert!(parse_order(r#"<codes sku="s" num-codes="0"/>"#).is_none());
        assert!(parse_order(r#"<codes sku="s" num-codes="many"/>"#).is_none());
        assert!(parse_order(r#"<codes sku="s" num-codes="1000"/>"#).is_none());
    }

    #[test]
    fn parse_order_rejects_garbage() {
        assert!(parse_order("").is_none());
        assert!(parse_order("sku=1").is_none());
        assert!(parse_order("<order sku=\"s\"/>").is_none());
    }

    #[test]
    fn error_document_escapes_text() {
        let doc = error_document(7, "a < b");
        assert!(doc.contains("<error-code>7</error-code>"));
        assert!(doc.contains("<error-text>a &lt; b</error-text>"));
    }

    #[test]
    fn new_codes_are_grouped_hex() {
        let code = new_code();
        assert_eq!(code.len(), 19);
        assert_eq!(code.matches('-').count(), 3);
        assert!(code.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
    }
}

//! Generic XML decoding into a `serde_json::Value` tree.
//!
//! # Design
//! Response bodies have no schema the client can rely on, so they are decoded
//! into a loose tree instead of typed structs:
//!
//! - the root element's name is dropped and its content becomes the top level
//! - child elements become keys; repeated siblings collapse into an array
//! - a text-only element becomes a string, an empty one becomes `{}`
//! - attributes live under `"@attributes"`, text next to other content
//!   under `"#text"`
//!
//! Whitespace-only text, comments, processing instructions, the declaration
//! and DOCTYPE are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

pub const ATTRIBUTES_KEY: &str = "@attributes";
pub const TEXT_KEY: &str = "#text";

/// Why a body could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("text outside of the root element")]
    StrayText,

    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

#[derive(Default)]
struct Node {
    attributes: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

impl Node {
    fn into_value(self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return if self.text.is_empty() {
                Value::Object(Map::new())
            } else {
                Value::String(self.text)
            };
        }

        let mut map = Map::new();
        if !self.attributes.is_empty() {
            map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(self.attributes));
        }
        for (name, value) in self.children {
            match map.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(name, value);
                }
            }
        }
        if !self.text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        Value::Object(map)
    }
}

/// Decode `input` into a tree.
///
/// Returns `Ok(None)` for an empty or whitespace-only body.
pub fn parse_document(input: &str) -> Result<Option<Value>, XmlError> {
    if input.trim().is_empty() {
        return Ok(None);
    }

    let mut reader = Reader::from_str(input);
    let mut stack: Vec<(String, Node)> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let syntax = |message: String| XmlError::Syntax { position, message };

        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::MultipleRoots);
                }
                let (name, node) = open_element(&start).map_err(syntax)?;
                stack.push((name, node));
            }
            Ok(Event::Empty(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::MultipleRoots);
                }
                let (name, node) = open_element(&start).map_err(syntax)?;
                attach(&mut stack, &mut root, name, node.into_value());
            }
            Ok(Event::End(_)) => {
                // quick-xml already rejects mismatched end tags.
                let Some((name, node)) = stack.pop() else {
                    return Err(syntax("unexpected closing tag".to_string()));
                };
                attach(&mut stack, &mut root, name, node.into_value());
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| syntax(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(data)) => {
                let data = data.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&data))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(syntax(e.to_string())),
        }
    }

    if let Some((name, _)) = stack.pop() {
        return Err(XmlError::Unclosed(name));
    }
    root.map(Some).ok_or(XmlError::NoRoot)
}

fn open_element(start: &BytesStart<'_>) -> Result<(String, Node), String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = Node::default();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        node.attributes.insert(key, Value::String(value.into_owned()));
    }
    Ok((name, node))
}

fn attach(stack: &mut [(String, Node)], root: &mut Option<Value>, name: String, value: Value) {
    match stack.last_mut() {
        Some((_, parent)) => parent.children.push((name, value)),
        None => *root = Some(value),
    }
}

fn push_text(stack: &mut [(String, Node)], text: &str) -> Result<(), XmlError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some((_, node)) => {
            node.text.push_str(text);
            Ok(())
        }
        None => Err(XmlError::StrayText),
    }
}

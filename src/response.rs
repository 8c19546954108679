//! API response parsing.
//!
//! Every API response is an XML document. [`PaymentResponse`] keeps the raw text and
//! a structured view of it: a JSON tree where repeated child tags become arrays,
//! attributes are keyed with a leading `@` and mixed text lands under `#text`.
//! Namespaces are stripped from tag names so lookups do not depend on them.

use crate::errors::{AmazonPayError, Result};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::fmt::Display;

/// Prefix for attribute keys in the structured view.
pub const ATTRIBUTE_PREFIX: &str = "@";

/// Key holding text of elements that also have children or attributes.
pub const TEXT_KEY: &str = "#text";

/// Result of one API round trip.
///
/// Successful calls and business-level failures are both represented here; they
/// differ only in [`success`](Self::success).
///
/// # Examples
///
/// ```
/// use amazon_pay::response::PaymentResponse;
///
/// let response = PaymentResponse::parse(
///     "<GetServiceStatusResponse><GetServiceStatusResult><Status>GREEN</Status>\
///      </GetServiceStatusResult><ResponseMetadata><RequestId>abc</RequestId>\
///      </ResponseMetadata></GetServiceStatusResponse>",
/// )
/// .unwrap();
///
/// assert!(response.success());
/// assert_eq!(response.request_id(), Some("abc"));
/// assert_eq!(
///     response.get(&["GetServiceStatusResponse", "GetServiceStatusResult", "Status"]),
///     Some(&serde_json::json!("GREEN"))
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResponse {
    success: bool,
    status_code: Option<u16>,
    xml: String,
    response_type: String,
    request_id: Option<String>,
    document: Value,
}

impl PaymentResponse {
    /// Parses a successful response body.
    pub fn parse(xml: impl Into<String>) -> Result<Self> {
        Self::build(xml.into(), true)
    }

    /// Parses an error response body.
    pub fn parse_error(xml: impl Into<String>) -> Result<Self> {
        Self::build(xml.into(), false)
    }

    /// Synthetic error response for a throttled call: `<error>{status}</error>`.
    pub fn throttled(status_code: u16) -> Result<Self> {
        Ok(Self::parse_error(format!("<error>{}</error>", status_code))?.with_status_code(status_code))
    }

    pub(crate) fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    fn build(xml: String, success: bool) -> Result<Self> {
        let root = parse_document(&xml)?;

        // Some regions spell it RequestID.
        let request_id = root
            .find_text("RequestId")
            .or_else(|| root.find_text("RequestID"))
            .map(str::to_string);

        let mut document = Map::new();
        document.insert(root.name.clone(), root.to_value());

        Ok(Self {
            success,
            status_code: None,
            response_type: root.name,
            request_id,
            document: Value::Object(document),
            xml,
        })
    }

    /// True for HTTP 200 responses.
    pub fn success(&self) -> bool {
        self.success
    }

    /// HTTP status of the round trip, when the response came from the network.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Name of the root element without namespace, e.g. `AuthorizeResponse`.
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// Request identifier assigned by the API.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Raw XML exactly as received.
    pub fn to_xml(&self) -> &str {
        &self.xml
    }

    /// Structured view serialized as JSON.
    pub fn to_json(&self) -> String {
        self.document.to_string()
    }

    /// Structured view of the document.
    pub fn to_dict(&self) -> &Value {
        &self.document
    }

    /// Walks the structured view by element names.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.document, |value, key| value.get(key))
    }
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(invalid_xml)?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let value = attr.unescape_value().map_err(invalid_xml)?;
            attributes.push((String::from_utf8_lossy(key).into_owned(), value.into_owned()));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            text: None,
            children: Vec::new(),
        })
    }

    /// Only text before the first child element counts.
    fn push_text(&mut self, text: &str) {
        if self.children.is_empty() {
            self.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    /// Text of the first descendant named `name`, in document order.
    fn find_text(&self, name: &str) -> Option<&str> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child.text.as_deref().unwrap_or(""))
            } else {
                child.find_text(name)
            }
        })
    }

    fn to_value(&self) -> Value {
        let text = self.text.as_deref().map(str::trim);

        if self.children.is_empty() && self.attributes.is_empty() {
            return text.map_or(Value::Null, |t| Value::String(t.to_string()));
        }

        let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();
        for child in &self.children {
            let value = child.to_value();
            match groups.iter_mut().find(|(name, _)| *name == child.name) {
                Some((_, values)) => values.push(value),
                None => groups.push((child.name.as_str(), vec![value])),
            }
        }

        let mut map = Map::new();
        for (name, mut values) in groups {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            map.insert(name.to_string(), value);
        }
        for (key, value) in &self.attributes {
            map.insert(format!("{}{}", ATTRIBUTE_PREFIX, key), Value::String(value.clone()));
        }
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }

        Value::Object(map)
    }
}

fn invalid_xml<E: Display>(err: E) -> AmazonPayError {
    AmazonPayError::InvalidXml(err.to_string())
}

fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(invalid_xml)? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(invalid_xml("junk after document element"));
                }
                stack.push(Element::from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| invalid_xml("closing tag without opening tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.xml_content().map_err(invalid_xml)?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut stack, &text)?;
            }
            Event::GeneralRef(reference) => {
                let text = resolve_reference(&reference)?;
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(invalid_xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| invalid_xml("document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(invalid_xml("junk after document element")),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(element) => element.push_text(text),
        None if text.trim().is_empty() => {}
        None => return Err(invalid_xml("text outside the document element")),
    }
    Ok(())
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String> {
    let name = String::from_utf8_lossy(reference).into_owned();

    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        };
        return parsed
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| invalid_xml(format!("invalid character reference &{};", name)));
    }

    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| invalid_xml(format!("unknown entity &{};", name)))
}
